//! Copying request headers and cookies into argument fields.

use cookie::Cookie;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{apply, lenient, FlatParams, MergeError, MergeOptions};
use crate::metadata::Metadata;

/// Which headers and cookies land in which fields.
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
}

impl FillOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy header `name` into `field`.
    pub fn header(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.headers.push((name.into(), field.into()));
        self
    }

    /// Copy cookie `name` into `field`.
    pub fn cookie(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.cookies.push((name.into(), field.into()));
        self
    }

    fn params(&self, md: &Metadata) -> FlatParams {
        let mut params = FlatParams::new();
        for (name, field) in &self.headers {
            for value in md.get_all(name) {
                params.append(field, value.clone());
            }
        }
        if self.cookies.is_empty() {
            return params;
        }
        for line in md.get_all("Cookie") {
            for cookie in Cookie::split_parse(line.as_str()).filter_map(Result::ok) {
                let (name, value) = cookie.name_value_trimmed();
                for (_, field) in self.cookies.iter().filter(|(n, _)| n == name) {
                    params.append(field, value);
                }
            }
        }
        params
    }
}

/// Fill fields of `target` from incoming metadata.
///
/// Fields are resolved like query parameters; unmatched fields are left
/// untouched.
pub fn fill_request<T>(target: &mut T, md: &Metadata, options: &FillOptions) -> Result<(), MergeError>
where
    T: Serialize + DeserializeOwned,
{
    let params = options.params(md);
    if params.is_empty() {
        return Ok(());
    }
    let mut value = serde_json::to_value(&*target)?;
    let merge_options = MergeOptions {
        append_lists: false,
        ..MergeOptions::default()
    };
    apply::merge(&mut value, &params, &merge_options)?;
    *target = lenient::from_value(value)?;
    Ok(())
}
