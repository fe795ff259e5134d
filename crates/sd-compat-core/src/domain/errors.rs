use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CompatResult<T> = Result<T, CompatError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompatErrorCategory {
    Success,
    RegressionFailure,
    InputValidationError,
    IoSystemError,
    InternalError,
}

impl CompatErrorCategory {
    pub const fn exit_status(self) -> ExitStatusMapping {
        match self {
            Self::Success => ExitStatusMapping {
                exit_code: 0,
                rust_category: "Success",
            },
            Self::RegressionFailure => ExitStatusMapping {
                exit_code: 1,
                rust_category: "RegressionFailure",
            },
            Self::InputValidationError => ExitStatusMapping {
                exit_code: 2,
                rust_category: "InputValidationError",
            },
            Self::IoSystemError => ExitStatusMapping {
                exit_code: 3,
                rust_category: "IoSystemError",
            },
            Self::InternalError => ExitStatusMapping {
                exit_code: 5,
                rust_category: "InternalError",
            },
        }
    }

    pub const fn exit_code(self) -> i32 {
        self.exit_status().exit_code
    }

    pub const fn rust_category(self) -> &'static str {
        self.exit_status().rust_category
    }

    pub const fn is_fatal(self) -> bool {
        !matches!(self, Self::Success | Self::RegressionFailure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatusMapping {
    pub exit_code: i32,
    pub rust_category: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatError {
    category: CompatErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl CompatError {
    pub fn new(
        category: CompatErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(
            CompatErrorCategory::InputValidationError,
            placeholder,
            message,
        )
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(CompatErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(CompatErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> CompatErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        let severity = if self.category.is_fatal() {
            "ERROR"
        } else {
            "INFO"
        };
        format!("{}: [{}] {}", severity, self.placeholder, self.message)
    }

    pub fn fatal_exit_line(&self) -> Option<String> {
        self.category
            .is_fatal()
            .then(|| format!("FATAL EXIT CODE: {}", self.exit_code()))
    }
}

impl Display for CompatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.rust_category(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for CompatError {}
