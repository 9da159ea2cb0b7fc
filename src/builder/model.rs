//! Builder for declaring models.

use crate::builder::error::BuildError;
use crate::builder::field::FieldBuilder;
use crate::builder::transition::TransitionBuilder;
use crate::model::{Model, ModelKind, Signals};
use crate::transition::TransitionMethod;
use std::collections::HashSet;
use std::sync::Arc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use uuid::Uuid;

type Check = Validation<(), NonEmptyVec<BuildError>>;

/// Fluent declaration of a model.
///
/// Definition problems are reported all at once by [`build`](Self::build),
/// except duplicate transitions, which fail as soon as they are declared.
///
/// # Example
///
/// ```rust
/// use statefield::builder::{FieldBuilder, ModelBuilder, TransitionBuilder};
/// use statefield::field::{Record, RecordState};
///
/// struct BlogPost {
///     fsm: RecordState,
/// }
///
/// impl Record for BlogPost {
///     fn record_state(&self) -> &RecordState {
///         &self.fsm
///     }
///
///     fn record_state_mut(&mut self) -> &mut RecordState {
///         &mut self.fsm
///     }
/// }
///
/// let model = ModelBuilder::<BlogPost>::new("BlogPost")
///     .field(FieldBuilder::new("state").default("new"))
///     .transition(
///         "publish",
///         TransitionBuilder::new("state").source("new").target("published"),
///     )
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let mut post = BlogPost { fsm: model.initial_state() };
/// model.invoke(&mut post, "publish", |_| Ok::<_, String>(())).unwrap();
/// assert_eq!(model.state(&post, "state").unwrap(), "published");
/// ```
pub struct ModelBuilder<T> {
    name: String,
    table: Option<String>,
    kind: ModelKind,
    parents: Vec<Arc<Model<T>>>,
    fields: Vec<FieldBuilder>,
    methods: Vec<TransitionMethod<T>>,
    roles: Vec<String>,
    concurrency_guard: bool,
}

impl<T> ModelBuilder<T> {
    /// Declare a concrete model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            kind: ModelKind::Concrete,
            parents: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            roles: Vec::new(),
            concurrency_guard: false,
        }
    }

    /// Declare an abstract model, only usable as a parent.
    pub fn abstract_model(name: impl Into<String>) -> Self {
        Self {
            kind: ModelKind::Abstract,
            ..Self::new(name)
        }
    }

    /// Declare a mixin: transition methods without fields of its own.
    pub fn mixin(name: impl Into<String>) -> Self {
        Self {
            kind: ModelKind::Mixin,
            ..Self::new(name)
        }
    }

    /// Inherit fields, methods and roles from `parent`. Earlier parents
    /// take precedence over later ones.
    pub fn extends(mut self, parent: Arc<Model<T>>) -> Self {
        self.parents.push(parent);
        self
    }

    /// Store records under `table` instead of the model name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldBuilder) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a role records may play, selected by their states.
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Make saves fail when the stored states changed since load.
    pub fn concurrency_guard(mut self) -> Self {
        self.concurrency_guard = true;
        self
    }

    /// Declare a transition of method `method`.
    ///
    /// Declaring the same method again stacks another transition onto it,
    /// for the same field or a different one. Fails when the method already
    /// has a transition of that field from one of the sources.
    pub fn transition(
        mut self,
        method: &str,
        transition: TransitionBuilder<T>,
    ) -> Result<Self, BuildError> {
        let (field, sources, rule) = transition.build(method)?;

        let index = match self.methods.iter().position(|m| m.name() == method) {
            Some(index) => index,
            None => {
                self.methods.push(TransitionMethod::new(method));
                self.methods.len() - 1
            }
        };
        for source in sources {
            self.methods[index].add_transition(&field, source, rule.clone())?;
        }
        Ok(self)
    }

    /// Build the model, reporting every definition problem found.
    pub fn build(self) -> Result<Arc<Model<T>>, BuildError> {
        let mut checks: Vec<Check> = Vec::new();

        if self.kind == ModelKind::Mixin && !self.fields.is_empty() {
            checks.push(Validation::fail(BuildError::MixinWithFields {
                model: self.name.clone(),
            }));
        }

        let inherited: HashSet<String> = self
            .parents
            .iter()
            .flat_map(|parent| parent.fields())
            .map(|field| field.name().to_string())
            .collect();
        let mut declared = HashSet::new();
        for field in &self.fields {
            let clash = !declared.insert(field.name().to_string())
                || inherited.contains(field.name());
            checks.push(if clash {
                Validation::fail(BuildError::DuplicateField {
                    model: self.name.clone(),
                    field: field.name().to_string(),
                })
            } else {
                Validation::success(())
            });
        }

        let mut roles: Vec<String> = self.roles.clone();
        for parent in &self.parents {
            roles.extend(parent.roles().into_iter().map(str::to_string));
        }
        for field in &self.fields {
            for choice in field.choices() {
                let Some(role) = &choice.role else {
                    continue;
                };
                checks.push(if roles.contains(role) {
                    Validation::success(())
                } else {
                    Validation::fail(BuildError::UnknownRole {
                        field: field.name().to_string(),
                        state: choice.value.to_string(),
                        role: role.clone(),
                    })
                });
            }
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            match field.build() {
                Ok(binding) => fields.push(Arc::new(binding)),
                Err(error) => checks.push(Validation::fail(error)),
            }
        }

        let model = Model {
            id: Uuid::new_v4(),
            table: self.table.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            kind: self.kind,
            parents: self.parents,
            fields,
            methods: self.methods.into_iter().map(Arc::new).collect(),
            roles: self.roles,
            concurrency_guard: self.concurrency_guard,
            signals: Signals::new(),
        };

        // Mixins and abstract models may reference fields their children
        // declare; only concrete models must resolve every one.
        if model.kind == ModelKind::Concrete {
            for method in model.visible_methods() {
                for registry in method.registries() {
                    checks.push(if model.field(registry.field()).is_some() {
                        Validation::success(())
                    } else {
                        Validation::fail(BuildError::UnknownField {
                            model: model.name.clone(),
                            method: method.name().to_string(),
                            field: registry.field().to_string(),
                        })
                    });
                }
            }
        }

        match Validation::all_vec(checks) {
            Validation::Success(_) => Ok(Arc::new(model)),
            Validation::Failure(errors) => Err(BuildError::from_many(errors.iter().cloned().collect())),
        }
    }
}
