use std::fmt;

use crate::error::{Error, Result};
use crate::template::{Attr, Attrs};

/// Conversion from an attribute value to a parameter type.
pub trait FromAttr: Sized {
    fn from_attr(attr: &Attr) -> Option<Self>;
}

impl FromAttr for bool {
    fn from_attr(attr: &Attr) -> Option<Self> {
        attr.as_bool()
    }
}

impl FromAttr for i64 {
    fn from_attr(attr: &Attr) -> Option<Self> {
        attr.as_int()
    }
}

impl FromAttr for u64 {
    fn from_attr(attr: &Attr) -> Option<Self> {
        attr.as_int().and_then(|i| u64::try_from(i).ok())
    }
}

impl FromAttr for String {
    fn from_attr(attr: &Attr) -> Option<Self> {
        attr.as_str().map(str::to_string)
    }
}

/// Named engine parameter with a default.
#[derive(Debug, Clone)]
pub struct Parameter<T> {
    name: &'static str,
    default: T,
    value: T,
}

impl<T: FromAttr + Clone + fmt::Debug> Parameter<T> {
    pub fn new(name: &'static str, default: T) -> Self {
        Parameter {
            name,
            value: default.clone(),
            default,
        }
    }

    pub fn configure(&mut self, attrs: &Attrs) -> Result<()> {
        self.value = match attrs.get(self.name) {
            None => self.default.clone(),
            Some(attr) => T::from_attr(attr).ok_or_else(|| {
                Error::InvalidParameter(format!("{} = {:?} (default {:?})", self.name, attr, self.default))
            })?,
        };
        Ok(())
    }

    pub fn get(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let mut limit = Parameter::new("trace_count_limit", -1i64);
        limit.configure(&Attrs::new()).unwrap();
        assert_eq!(*limit.get(), -1);

        let attrs: Attrs = serde_yaml::from_str("trace_count_limit: 3").unwrap();
        limit.configure(&attrs).unwrap();
        assert_eq!(*limit.get(), 3);

        let bad: Attrs = serde_yaml::from_str("trace_count_limit: many").unwrap();
        assert!(matches!(limit.configure(&bad), Err(Error::InvalidParameter(_))));
    }
}
