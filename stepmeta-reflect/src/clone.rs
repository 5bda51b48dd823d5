use stepmeta_core::{ObjectRef, Value, ValueType};

/// Produces the copy of a value written to one underlying member of a parameter.
///
/// `primary` is true for the parameter's primary pair. `context` is the object
/// owning the member being written and `target` its declared value type.
/// Returning `None` skips the write for that member.
pub trait ValueCloner: Send + Sync {
    /// Clones `value` for one underlying member
    fn clone_value(
        &self,
        value: &Value,
        primary: bool,
        context: &ObjectRef,
        target: &ValueType,
    ) -> Option<Value>;
}

impl<F> ValueCloner for F
where
    F: Fn(&Value, bool, &ObjectRef, &ValueType) -> Option<Value> + Send + Sync,
{
    fn clone_value(
        &self,
        value: &Value,
        primary: bool,
        context: &ObjectRef,
        target: &ValueType,
    ) -> Option<Value> {
        self(value, primary, context, target)
    }
}

/// Deep-copies values, converting them to the target type where possible.
///
/// Values that cannot be converted are passed through unchanged so that the
/// member being written reports the mismatch. `Null` is only written to the
/// primary member.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeepCloner;

impl ValueCloner for DeepCloner {
    fn clone_value(
        &self,
        value: &Value,
        primary: bool,
        _context: &ObjectRef,
        target: &ValueType,
    ) -> Option<Value> {
        if value.is_null() && !primary {
            return None;
        }
        Some(target.convert(value).unwrap_or_else(|| value.clone()))
    }
}
