mod internal;

pub(crate) use self::internal::Internal;
