//! The [`Claim`] accessor and the [`Claims`] bag it reads and writes.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A JSON-compatible claim bag: unique string keys, arbitrary structured values.
///
/// An absent bag is modelled as `Option<Claims>::None`; every accessor
/// operation tolerates it.
pub type Claims = Map<String, Value>;

/// Error constructing a [`Claim`] from a key path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimPathError {
    /// The path has no segments, so the accessor could never address a value.
    #[error("claim path must contain at least one segment")]
    Empty,
}

/// Typed accessor bound to a key or a key path inside a [`Claims`] bag.
///
/// The accessor owns no claim data; it operates on whatever bag the caller
/// supplies. Reads never fail loudly: anything that prevents producing a `T`
/// (absent bag, missing key, non-object intermediate, value of another type)
/// reads as `None`.
pub struct Claim<T> {
    path: Vec<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Claim<T> {
    /// Accessor for a single top-level key, e.g. `claims["sub"]`.
    #[must_use]
    pub fn top_level(key: impl Into<String>) -> Self {
        Self {
            path: vec![key.into()],
            _marker: PhantomData,
        }
    }

    /// Accessor for a nested key path, e.g. `claims["address"]["city"]`.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimPathError::Empty`] when `path` yields no segments.
    pub fn try_nested<I, S>(path: I) -> Result<Self, ClaimPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        if path.is_empty() {
            return Err(ClaimPathError::Empty);
        }
        Ok(Self {
            path,
            _marker: PhantomData,
        })
    }

    /// Accessor for a nested key path known to be non-empty.
    ///
    /// Intended for literal paths fixed at compile time; use
    /// [`Claim::try_nested`] for paths built at runtime.
    ///
    /// # Panics
    ///
    /// Panics when `path` is empty. An empty path can never address a value,
    /// so the accessor refuses to exist rather than failing on first use.
    #[must_use]
    pub fn nested<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match Self::try_nested(path) {
            Ok(claim) => claim,
            Err(e) => panic!("invalid nested claim: {e}"),
        }
    }

    /// Path segments this accessor addresses, outermost first.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }
}

impl<T: Serialize + DeserializeOwned> Claim<T> {
    /// Read the claim.
    ///
    /// Intermediate segments are only descended through when they hold JSON
    /// objects. The final value must deserialize into a `T` that serializes
    /// back to the identical JSON value; anything else reads as `None` even
    /// though the key exists. Numbers therefore never cross types: an
    /// integer does not read through a `Claim<f64>`, nor a float through a
    /// `Claim<i64>`.
    pub fn get<'a>(&self, claims: impl Into<Option<&'a Claims>>) -> Option<T> {
        let mut current = claims.into()?;
        let (last, parents) = self.path.split_last()?;
        for segment in parents {
            current = current.get(segment.as_str())?.as_object()?;
        }
        let value = current.get(last.as_str())?;
        exact(value)
    }

    /// Write the claim.
    ///
    /// Missing intermediate objects are created. Writing into an absent bag,
    /// or through an intermediate that holds a non-object value, is a silent
    /// no-op and leaves the bag untouched. So is writing a value whose JSON
    /// form would not read back as the same `T`, such as a non-finite float
    /// (JSON has no NaN or infinity).
    pub fn set<'a>(&self, claims: impl Into<Option<&'a mut Claims>>, value: T) {
        let Some(mut current) = claims.into() else {
            return;
        };
        let Some((last, parents)) = self.path.split_last() else {
            return;
        };
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        if exact::<T>(&value).is_none() {
            return;
        }

        for segment in parents {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Claims::new()));
            let Value::Object(next) = slot else {
                return;
            };
            current = next;
        }
        current.insert(last.clone(), value);
    }
}

/// `value` as a `T`, only if that `T` serializes back to `value` unchanged.
fn exact<T: Serialize + DeserializeOwned>(value: &Value) -> Option<T> {
    let typed = T::deserialize(value).ok()?;
    (serde_json::to_value(&typed).ok()? == *value).then_some(typed)
}

impl<T> Clone for Claim<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Claim<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("path", &self.path)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Read `claim` from `claims`. Same as [`Claim::get`].
pub fn get_claim<'a, T: Serialize + DeserializeOwned>(
    claims: impl Into<Option<&'a Claims>>,
    claim: &Claim<T>,
) -> Option<T> {
    claim.get(claims)
}

/// Write `value` into `claims` under `claim`. Same as [`Claim::set`].
pub fn set_claim<'a, T: Serialize + DeserializeOwned>(
    claims: impl Into<Option<&'a mut Claims>>,
    claim: &Claim<T>,
    value: T,
) {
    claim.set(claims, value);
}
