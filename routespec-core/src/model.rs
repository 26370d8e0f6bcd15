use std::any::{Any, TypeId};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ErrorDetail;

/// A type usable as a query, body, header, cookie or response model.
///
/// Decoding goes through serde, the documented schema comes from schemars,
/// and `check` runs field constraints after decoding. Use [`impl_model!`]
/// for plain models and [`impl_validated_model!`] for `garde` models.
///
/// [`impl_model!`]: crate::impl_model
/// [`impl_validated_model!`]: crate::impl_validated_model
pub trait Model: DeserializeOwned + JsonSchema + Send + Sync + 'static {
    fn check(&self) -> Result<(), garde::Report> {
        Ok(())
    }
}

/// Implement [`Model`] for types without field constraints.
///
/// ```ignore
/// routespec::impl_model!(User, Users);
/// ```
#[macro_export]
macro_rules! impl_model {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl $crate::model::Model for $ty {}
        )*
    };
}

/// Implement [`Model`] for types deriving `garde::Validate` with a unit context.
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema, garde::Validate)]
/// struct Resp {
///     #[garde(range(min = 0.0, max = 1.0))]
///     score: f64,
/// }
///
/// routespec::impl_validated_model!(Resp);
/// ```
#[macro_export]
macro_rules! impl_validated_model {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl $crate::model::Model for $ty {
                fn check(&self) -> Result<(), $crate::garde::Report> {
                    $crate::garde::Validate::validate(self)
                }
            }
        )*
    };
}

type Decoder = fn(Value) -> Result<Arc<dyn Any + Send + Sync>, Vec<ErrorDetail>>;
type ListChecker = fn(Value) -> Result<(), Vec<ErrorDetail>>;

/// Type-erased handle to a [`Model`].
#[derive(Clone)]
pub struct ModelRef {
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    schema: fn() -> Value,
    decode: Decoder,
    check_list: ListChecker,
}

impl ModelRef {
    pub fn of<T: Model>() -> Self {
        Self {
            name: T::schema_name().into_owned(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            schema: root_schema::<T>,
            decode: decode::<T>,
            check_list: check_list::<T>,
        }
    }

    /// Component name, as produced by schemars.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Root JSON schema (Draft 2020-12, `$defs` not yet promoted).
    pub fn schema(&self) -> Value {
        (self.schema)()
    }

    /// Decode and check a single value, returning the model instance.
    pub fn decode(&self, value: Value) -> Result<Arc<dyn Any + Send + Sync>, Vec<ErrorDetail>> {
        (self.decode)(value)
    }

    /// Decode and check a JSON array of this model.
    pub fn check_list(&self, value: Value) -> Result<(), Vec<ErrorDetail>> {
        (self.check_list)(value)
    }
}

impl std::fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRef")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

fn root_schema<T: JsonSchema>() -> Value {
    schemars::schema_for!(T).to_value()
}

fn decode_one<T: Model>(value: &Value) -> Result<T, Vec<ErrorDetail>> {
    let model: T = serde_path_to_error::deserialize(value.clone())
        .map_err(|err| vec![ErrorDetail::from_serde(&err, value)])?;
    model
        .check()
        .map_err(|report| ErrorDetail::from_garde(&report, value))?;
    Ok(model)
}

fn decode<T: Model>(value: Value) -> Result<Arc<dyn Any + Send + Sync>, Vec<ErrorDetail>> {
    let model = decode_one::<T>(&value)?;
    Ok(Arc::new(model))
}

fn check_list<T: Model>(value: Value) -> Result<(), Vec<ErrorDetail>> {
    let Value::Array(items) = &value else {
        let err = serde_path_to_error::deserialize::<_, Vec<T>>(value.clone())
            .err()
            .map(|err| ErrorDetail::from_serde(&err, &value));
        return Err(err.into_iter().collect());
    };
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if let Err(item_errors) = decode_one::<T>(item) {
            errors.extend(item_errors.into_iter().map(|mut detail| {
                detail.loc.insert(0, Value::from(index as u64));
                detail
            }));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
