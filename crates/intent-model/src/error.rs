use thiserror::Error;

pub type Result<T, E = IntentsError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum IntentsError {
    #[error("config decode error: {0}")]
    ConfigDecode(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unknown slot list type: {0}")]
    UnknownListType(String),
    #[error("invalid range: {0}")]
    InvalidRange(&'static str),
    #[error("missing slot list {{{0}}}")]
    MissingList(String),
    #[error("slot list {{{0}}} is not a text list")]
    TargetNotText(String),
    #[error("template syntax error in {text:?}: {reason}")]
    TemplateSyntax { text: String, reason: String },
}
