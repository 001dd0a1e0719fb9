use std::{
    borrow::Cow,
    env::{VarError, var},
    error::Error,
    ffi::OsStr,
    fmt::{Display, Formatter},
    marker::PhantomData,
    str::FromStr,
};

use anyhow::Context;
use clap::{
    Arg, Command,
    builder::{NonEmptyStringValueParser, TypedValueParser, ValueParserFactory},
};

/// A value that may be loaded from the environment.
///
/// To load from the environment, the value must be in the format
/// `env:VAR_NAME`.
///
/// `T` must be [`FromStr`] for this to be used as a [`clap`] value type.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum MaybeEnv<T> {
    /// Value refers to an environment variable.
    EnvVar(String),

    /// Value was provided directly.
    Value(T),
}

impl<T> MaybeEnv<T>
where
    T: Clone + FromStr<Err: Error + Send + Sync + 'static>,
{
    /// Resolves this value, failing if the variable isn't set.
    pub fn resolve(&self) -> anyhow::Result<Cow<'_, T>> {
        self.resolve_optional()?.with_context(|| match self {
            MaybeEnv::EnvVar(var_name) => format!("'{var_name}' not found in environment"),
            MaybeEnv::Value(_) => "missing value".to_string(),
        })
    }

    /// Resolves this value, or `None` if it refers to an unset variable.
    pub fn resolve_optional(&self) -> anyhow::Result<Option<Cow<'_, T>>> {
        match self {
            MaybeEnv::EnvVar(var_name) => {
                let value = match var(var_name) {
                    Ok(value) => value,
                    Err(VarError::NotPresent) => return Ok(None),
                    Err(error) => {
                        return Err(error).with_context(|| format!("failed to read {var_name}"));
                    }
                };

                let value = value
                    .parse()
                    .with_context(|| format!("failed to parse {var_name}"))?;
                Ok(Some(Cow::Owned(value)))
            }
            MaybeEnv::Value(value) => Ok(Some(Cow::Borrowed(value))),
        }
    }
}

impl<T> Display for MaybeEnv<T>
where
    T: Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MaybeEnv::EnvVar(var_name) => write!(f, "env:{var_name}"),
            MaybeEnv::Value(value) => value.fmt(f),
        }
    }
}

impl<T> FromStr for MaybeEnv<T>
where
    T: FromStr,
{
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("env:") {
            Some(var_name) if is_var_name(var_name) => Ok(MaybeEnv::EnvVar(var_name.to_string())),
            _ => T::from_str(s).map(MaybeEnv::Value),
        }
    }
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl<T> ValueParserFactory for MaybeEnv<T> {
    type Parser = MaybeEnvParser<T>;

    fn value_parser() -> Self::Parser {
        MaybeEnvParser(PhantomData)
    }
}

/// Value parser for [`MaybeEnv`]s.
#[derive(Clone, Debug)]
pub struct MaybeEnvParser<T>(PhantomData<fn() -> T>);

impl<T> TypedValueParser for MaybeEnvParser<T>
where
    T: Clone + Send + Sync + 'static,
    T: FromStr<Err: Into<Box<dyn Error + Send + Sync>>>,
{
    type Value = MaybeEnv<T>;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let inner = NonEmptyStringValueParser::default();
        let value = inner.parse_ref(cmd, arg, value)?;
        TypedValueParser::parse_ref(&MaybeEnv::<T>::from_str, cmd, arg, OsStr::new(&value))
    }
}
