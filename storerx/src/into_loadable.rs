use crate::{LoadError, Loadable};
use std::fmt::Display;

/// Conversion from the output of a fallible computation into a [`Loadable`].
///
/// Implemented for `Result<T, E>` (an `Err` becomes [`LoadError::Message`]) and
/// `Option<T>` (a `None` becomes [`LoadError::Missing`]).
pub trait IntoLoadable<T> {
    fn into_loadable(self) -> Loadable<T>;
}

impl<T, E> IntoLoadable<T> for Result<T, E>
where
    E: Display,
{
    fn into_loadable(self) -> Loadable<T> {
        match self {
            Ok(value) => Loadable::success(value),
            Err(error) => Loadable::failure(LoadError::Message(error.to_string())),
        }
    }
}

impl<T> IntoLoadable<T> for Option<T> {
    fn into_loadable(self) -> Loadable<T> {
        match self {
            Some(value) => Loadable::success(value),
            None => Loadable::failure(LoadError::Missing),
        }
    }
}

impl<T> IntoLoadable<T> for Loadable<T> {
    fn into_loadable(self) -> Loadable<T> {
        self
    }
}
