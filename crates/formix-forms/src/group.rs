//! The form-group aggregator.
//!
//! A [`FormGroup`] composes a main form, zero or more child formsets
//! (records pointing at the main record through a foreign key), and zero
//! or more one-to-one satellite forms into a single unit with one
//! serialize / deserialize / validate / save lifecycle.
//!
//! The wire contract on the serialize side is the `(content, schema,
//! order)` triple: content holds current values (child lists nested under
//! `formsets`, satellites under their attribute name), schema describes
//! every field, formset, and satellite, and order lists the main fields
//! followed by the reverse names and satellite attributes.

use formix_core::{FormixError, FormixResult, ValidationError};
use formix_db::executor::{
    count_instances, delete_instance, filter_instances, get_instance, save_instance, DbExecutor,
};
use formix_db::{Instance, Value};
use tracing::debug;

use crate::convert::{instance_to_dict, ConvertOpts};
use crate::form::{FieldOverride, FormConfig, ModelForm};
use crate::formset::{FormSetConfig, FormSetPartition, ModelFormSet};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Binds a child formset to the group.
///
/// `fk_field` names the foreign key on the child model that points at the
/// main record; `reverse_name` is the key the child collection travels
/// under in content, schema, and order. Both are declared explicitly.
#[derive(Debug, Clone)]
pub struct ChildBinding {
    /// The child formset configuration.
    pub formset: FormSetConfig,
    /// The foreign key field on the child model.
    pub fk_field: &'static str,
    /// The wire key for this child collection.
    pub reverse_name: &'static str,
}

/// Binds a one-to-one satellite form to the group.
#[derive(Debug, Clone)]
pub struct SatelliteBinding {
    /// The one-to-one field on the main model.
    pub attr: &'static str,
    /// The satellite form configuration.
    pub form: FormConfig,
}

struct BoundChild {
    reverse_name: &'static str,
    fk_field: &'static str,
    formset: ModelFormSet,
}

/// Outcome of saving one child collection, for caller inspection.
pub struct SavedChildren {
    /// The wire key of the collection.
    pub reverse_name: String,
    /// The classified records after saving.
    pub partition: FormSetPartition,
}

/// A main form plus its child formsets and one-to-one satellites.
pub struct FormGroup {
    main: FormConfig,
    children: Vec<ChildBinding>,
    satellites: Vec<SatelliteBinding>,

    main_form: Option<ModelForm>,
    bound_children: Vec<BoundChild>,
    satellite_forms: Vec<(&'static str, ModelForm)>,
    saved_children: Vec<SavedChildren>,
    satellite_instances: Vec<(&'static str, Instance)>,
}

impl FormGroup {
    /// Creates a group over a main form configuration.
    pub const fn new(main: FormConfig) -> Self {
        Self {
            main,
            children: Vec::new(),
            satellites: Vec::new(),
            main_form: None,
            bound_children: Vec::new(),
            satellite_forms: Vec::new(),
            saved_children: Vec::new(),
            satellite_instances: Vec::new(),
        }
    }

    /// Adds a child formset binding.
    #[must_use]
    pub fn child(mut self, binding: ChildBinding) -> Self {
        self.children.push(binding);
        self
    }

    /// Adds a one-to-one satellite binding.
    #[must_use]
    pub fn satellite(mut self, binding: SatelliteBinding) -> Self {
        self.satellites.push(binding);
        self
    }

    /// The main model's metadata.
    pub const fn meta(&self) -> &'static formix_db::ModelMeta {
        self.main.meta
    }

    // Bindings are validated lazily, on first serialize or deserialize,
    // so a misdeclared group fails loudly instead of producing a wrong
    // payload.
    fn validate_bindings(&self) -> FormixResult<()> {
        for child in &self.children {
            let meta = child.formset.form.meta;
            let field = meta.field(child.fk_field).ok_or_else(|| {
                FormixError::ImproperlyConfigured(format!(
                    "child model '{}' has no field '{}'",
                    meta.model_name, child.fk_field
                ))
            })?;
            if !field.is_forward_relation() {
                return Err(FormixError::ImproperlyConfigured(format!(
                    "field '{}' on child model '{}' is not a relation",
                    child.fk_field, meta.model_name
                )));
            }
        }
        for satellite in &self.satellites {
            let field = self.main.meta.field(satellite.attr).ok_or_else(|| {
                FormixError::ImproperlyConfigured(format!(
                    "main model '{}' has no field '{}'",
                    self.main.meta.model_name, satellite.attr
                ))
            })?;
            if !matches!(
                field.field_type,
                formix_db::FieldType::OneToOneField { .. }
            ) {
                return Err(FormixError::ImproperlyConfigured(format!(
                    "field '{}' on main model '{}' is not a one-to-one field",
                    satellite.attr, self.main.meta.model_name
                )));
            }
        }
        Ok(())
    }

    /// Serializes the group for the frontend.
    ///
    /// Returns the `(content, schema, order)` triple. Without `obj` the
    /// content carries only empty child lists; schema and order are
    /// complete either way. `queryset_overrides` substitutes an explicit
    /// child list for a reverse name; `field_overrides` adjusts main form
    /// fields before schema extraction. Read-only: no database writes.
    pub async fn serialize(
        &self,
        db: &dyn DbExecutor,
        obj: Option<&Instance>,
        queryset_overrides: &[(&str, Vec<Instance>)],
        field_overrides: &[(&str, FieldOverride)],
    ) -> FormixResult<(JsonMap, JsonMap, Vec<String>)> {
        self.validate_bindings()?;

        let mut content = match obj {
            Some(obj) => instance_to_dict(db, obj, &ConvertOpts::default()).await?,
            None => JsonMap::new(),
        };

        let mut main_form = ModelForm::new(self.main.clone())?;
        main_form.apply_overrides(field_overrides);
        let mut schema = main_form.schema();

        let mut order: Vec<String> =
            self.main.fields.iter().map(ToString::to_string).collect();

        let mut formset_schemas = JsonMap::new();
        let mut formset_contents = JsonMap::new();
        for child in &self.children {
            let child_meta = child.formset.form.meta;
            let fk_column = child_meta
                .field(child.fk_field)
                .map(formix_db::FieldDef::attname)
                .unwrap_or_else(|| child.fk_field.to_string());

            let members = if let Some((_, explicit)) = queryset_overrides
                .iter()
                .find(|(name, _)| *name == child.reverse_name)
            {
                explicit.clone()
            } else if let Some(pk) = obj.and_then(Instance::pk) {
                filter_instances(db, child_meta, &fk_column, pk.clone()).await?
            } else {
                Vec::new()
            };

            let formset = ModelFormSet::unbound(child.formset.clone(), members.len());
            let mut fs_schema = formset.schema()?;
            fs_schema.insert(
                "_parent_key_field".to_string(),
                serde_json::json!(child.fk_field),
            );
            formset_schemas.insert(
                child.reverse_name.to_string(),
                serde_json::Value::Object(fs_schema),
            );
            order.push(child.reverse_name.to_string());

            let mut member_dicts = Vec::with_capacity(members.len());
            for member in &members {
                member_dicts.push(serde_json::Value::Object(
                    instance_to_dict(db, member, &ConvertOpts::default()).await?,
                ));
            }
            formset_contents.insert(
                child.reverse_name.to_string(),
                serde_json::Value::Array(member_dicts),
            );
        }
        schema.insert(
            "formsets".to_string(),
            serde_json::Value::Object(formset_schemas),
        );
        content.insert(
            "formsets".to_string(),
            serde_json::Value::Object(formset_contents),
        );

        for satellite in &self.satellites {
            let satellite_form = ModelForm::new(satellite.form.clone())?;
            let mut sat_schema = satellite_form.schema();
            sat_schema.insert("type_".to_string(), serde_json::json!("one2one"));
            schema.insert(
                satellite.attr.to_string(),
                serde_json::Value::Object(sat_schema),
            );
            order.push(satellite.attr.to_string());

            if let Some(obj) = obj {
                let attname = self
                    .main
                    .meta
                    .field(satellite.attr)
                    .map(formix_db::FieldDef::attname)
                    .unwrap_or_else(|| format!("{}_id", satellite.attr));
                let link = obj.get(&attname).cloned().unwrap_or(Value::Null);
                if !link.is_null() {
                    // A dangling link serializes as absent rather than
                    // failing the whole payload.
                    match get_instance(db, satellite.form.meta, link).await {
                        Ok(related) => {
                            content.insert(
                                satellite.attr.to_string(),
                                serde_json::Value::Object(
                                    instance_to_dict(db, &related, &ConvertOpts::default())
                                        .await?,
                                ),
                            );
                        }
                        Err(FormixError::DoesNotExist(_)) => {}
                        Err(other) => return Err(other),
                    }
                }
            }
        }

        Ok((content, schema, order))
    }

    /// Consumes a submitted payload, binding every form in the group.
    ///
    /// An `id` key loads the main record (its absence means create);
    /// child lists are read from `payload.formsets[reverse_name]`, with a
    /// missing key treated as an empty list; a present, non-empty
    /// satellite object is bound to its own form (loading the satellite
    /// record when it carries a sub-`id`) and removed from the main data.
    ///
    /// No validation errors are raised here; lookup and structural
    /// failures are.
    pub async fn deserialize(
        &mut self,
        db: &dyn DbExecutor,
        payload: &JsonMap,
    ) -> FormixResult<()> {
        self.validate_bindings()?;
        self.bound_children.clear();
        self.satellite_forms.clear();
        self.saved_children.clear();
        self.satellite_instances.clear();

        let instance = match payload.get("id").filter(|v| !v.is_null()) {
            Some(id) => Some(get_instance(db, self.main.meta, Value::from_json(id)).await?),
            None => None,
        };

        let mut main_data = payload.clone();

        for child in &self.children {
            let child_meta = child.formset.form.meta;
            let fk_column = child_meta
                .field(child.fk_field)
                .map(formix_db::FieldDef::attname)
                .unwrap_or_else(|| child.fk_field.to_string());

            // The positional classification below hinges on this count
            // matching the children currently in the database.
            let initial_forms = match instance.as_ref().and_then(Instance::pk) {
                Some(pk) => {
                    count_instances(db, child_meta, &fk_column, pk.clone()).await? as usize
                }
                None => 0,
            };

            let members: Vec<JsonMap> = match payload
                .get("formsets")
                .and_then(|f| f.get(child.reverse_name))
            {
                Some(serde_json::Value::Array(items)) => items
                    .iter()
                    .map(|item| {
                        item.as_object().cloned().ok_or_else(|| {
                            FormixError::BadRequest(format!(
                                "formset '{}' entries must be objects",
                                child.reverse_name
                            ))
                        })
                    })
                    .collect::<FormixResult<_>>()?,
                Some(_) => {
                    return Err(FormixError::BadRequest(format!(
                        "formset '{}' must be a list",
                        child.reverse_name
                    )))
                }
                None => Vec::new(),
            };

            let formset =
                ModelFormSet::from_json(child.formset.clone(), &members, initial_forms)?;
            self.bound_children.push(BoundChild {
                reverse_name: child.reverse_name,
                fk_field: child.fk_field,
                formset,
            });
        }

        for satellite in &self.satellites {
            let Some(serde_json::Value::Object(sat_data)) = payload.get(satellite.attr) else {
                continue;
            };
            if sat_data.is_empty() {
                continue;
            }

            let sat_instance = match sat_data.get("id").filter(|v| !v.is_null()) {
                Some(id) => {
                    Some(get_instance(db, satellite.form.meta, Value::from_json(id)).await?)
                }
                None => None,
            };
            let mut form = ModelForm::new(satellite.form.clone())?;
            if let Some(inst) = sat_instance {
                form = form.with_instance(inst);
            }
            form.bind(sat_data);
            self.satellite_forms.push((satellite.attr, form));
            main_data.remove(satellite.attr);
        }

        let mut main_form = ModelForm::new(self.main.clone())?;
        if let Some(inst) = instance {
            main_form = main_form.with_instance(inst);
        }
        main_form.bind(&main_data);
        self.main_form = Some(main_form);
        Ok(())
    }

    /// Validates the main form, every satellite, and every formset.
    ///
    /// All three groups are always evaluated so errors accumulate across
    /// the whole group. An undeserialized group is invalid.
    pub async fn is_valid(&mut self) -> bool {
        let Some(main_form) = self.main_form.as_mut() else {
            return false;
        };
        let main_ok = main_form.is_valid().await;

        let mut satellites_ok = true;
        for (_, form) in &mut self.satellite_forms {
            if !form.is_valid().await {
                satellites_ok = false;
            }
        }

        let mut children_ok = true;
        for child in &mut self.bound_children {
            if !child.formset.is_valid().await {
                children_ok = false;
            }
        }

        main_ok && satellites_ok && children_ok
    }

    /// Collected errors: main field errors at the top level, satellite
    /// errors under the satellite's attribute name, formset errors (a
    /// list of per-member maps) under the reverse name.
    pub fn errors(&self) -> JsonMap {
        let mut errors = self
            .main_form
            .as_ref()
            .map(ModelForm::errors_json)
            .unwrap_or_default();

        for (attr, form) in &self.satellite_forms {
            errors.insert(
                (*attr).to_string(),
                serde_json::Value::Object(form.errors_json()),
            );
        }

        for child in &self.bound_children {
            errors.insert(
                child.reverse_name.to_string(),
                serde_json::Value::Array(
                    child
                        .formset
                        .errors()
                        .into_iter()
                        .map(serde_json::Value::Object)
                        .collect(),
                ),
            );
        }

        errors
    }

    /// Saves the whole group and returns the main record.
    ///
    /// Satellites are saved first and their keys linked onto the main
    /// record; child records get the main record's key written into their
    /// foreign key column, with deletions applied last. The `commit` flag
    /// governs every write in the group: with `commit` false nothing
    /// touches the database and the merged records are only built.
    ///
    /// # Errors
    ///
    /// [`FormixError::ValidationError`] when the group does not validate.
    pub async fn save(&mut self, db: &dyn DbExecutor, commit: bool) -> FormixResult<Instance> {
        if !self.is_valid().await {
            return Err(FormixError::ValidationError(ValidationError::new(
                "Form group did not pass validation",
                "invalid",
            )));
        }
        self.saved_children.clear();
        self.satellite_instances.clear();

        let main_form = self
            .main_form
            .as_mut()
            .ok_or_else(|| FormixError::BadRequest("form group is not bound".to_string()))?;
        let mut main_instance = main_form.save(db, commit).await?;

        let mut main_needs_resave = false;
        for (attr, form) in &mut self.satellite_forms {
            let satellite_instance = form.save(db, commit).await?;
            if let Some(pk) = satellite_instance.pk() {
                let attname = self
                    .main
                    .meta
                    .field(attr)
                    .map(formix_db::FieldDef::attname)
                    .unwrap_or_else(|| format!("{attr}_id"));
                main_instance.set(attname, pk.clone());
                main_needs_resave = true;
            }
            self.satellite_instances
                .push((*attr, satellite_instance));
        }
        if commit && main_needs_resave {
            save_instance(db, &mut main_instance).await?;
        }

        for child in &self.bound_children {
            let child_meta = child.formset.meta();
            let fk_column = child_meta
                .field(child.fk_field)
                .map(formix_db::FieldDef::attname)
                .unwrap_or_else(|| child.fk_field.to_string());

            let mut partition = child.formset.partition()?;

            for record in partition.new.iter_mut().chain(partition.changed.iter_mut()) {
                if let Some(pk) = main_instance.pk() {
                    record.set(fk_column.clone(), pk.clone());
                }
                if commit {
                    save_instance(db, record).await?;
                }
            }
            if commit {
                for record in &partition.deleted {
                    delete_instance(db, record).await?;
                }
            }
            debug!(
                reverse_name = child.reverse_name,
                new = partition.new.len(),
                changed = partition.changed.len(),
                deleted = partition.deleted.len(),
                "saved child collection"
            );
            self.saved_children.push(SavedChildren {
                reverse_name: child.reverse_name.to_string(),
                partition,
            });
        }

        Ok(main_instance)
    }

    /// Per-collection save outcomes from the last [`Self::save`].
    pub fn saved_children(&self) -> &[SavedChildren] {
        &self.saved_children
    }

    /// Satellite records from the last [`Self::save`], keyed by
    /// attribute name.
    pub fn satellite_instances(&self) -> &[(&'static str, Instance)] {
        &self.satellite_instances
    }
}
