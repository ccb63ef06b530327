pub(crate) mod encode;
pub(crate) mod multipart;
pub(crate) mod signing;
pub(crate) mod text;
