use std::{fmt::Display, ops::Deref, str::FromStr};

/// Carries a value through config files and the environment as its string form
///
/// Anything that parses from a string and displays back into one can be layered by the
/// `config` crate this way, even when it has no serde impls of its own.
#[derive(Clone, Debug)]
pub(crate) struct Serde<T> {
    inner: T,
}

impl<T> Serde<T> {
    pub(crate) const fn new(inner: T) -> Self {
        Serde { inner }
    }
}

impl<T> Deref for Serde<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> FromStr for Serde<T>
where
    T: FromStr,
{
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Serde::new)
    }
}

impl<T> serde::Serialize for Serde<T>
where
    T: Display,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(&self.inner)
    }
}

impl<'de, T> serde::Deserialize<'de> for Serde<T>
where
    T: FromStr,
    T::Err: Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;

        s.parse().map_err(<D::Error as serde::de::Error>::custom)
    }
}
