pub(crate) mod fetch;
pub(crate) mod info;
pub(crate) mod init;
pub(crate) mod list;
pub(crate) mod log;
pub(crate) mod publish;
