use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Communication error: {0}")]
    Communication(String),
    #[error("Authentication error")]
    Authentication,
    #[error("Unable to get password of '{0}': {1}")]
    FailToGetPassword(String, String),
    #[error("Unable to set password of '{0}': {1}")]
    FailToSetPassword(String, String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Incomplete instance, missing: {}", .0.join(", "))]
    IncompleteInstance(Vec<String>),
    #[error("Invalid instance {0}")]
    InvalidInstance(String),
    #[error("Instance '{0}' already exist")]
    InstanceAlreadyExist(String),
    #[error("Read config error: '{0}'")]
    ReadConfig(String),
    #[error("Write config error: '{0}'")]
    WriteConfig(String),
    #[error("Unable to determine user home path")]
    UnableToFindHomeUser,
}

impl Error {
    /// Short human label of the failure kind, used as notification title
    pub fn category(&self) -> &'static str {
        match self {
            Error::Communication(_) => "Connection error",
            Error::Authentication => "Authentication error",
            Error::FailToGetPassword(_, _) | Error::FailToSetPassword(_, _) => {
                "Password storage error"
            }
            Error::NotFound(_) => "Not found",
            Error::IncompleteInstance(_) => "Incomplete information",
            Error::InvalidInstance(_) => "Invalid information",
            Error::InstanceAlreadyExist(_) => "Already configured",
            Error::ReadConfig(_) | Error::WriteConfig(_) | Error::UnableToFindHomeUser => {
                "Configuration error"
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            return Self::Communication(format!("Connection error: {}", error));
        }

        if error.is_timeout() {
            return Self::Communication(format!("Timeout: {}", error));
        }

        Self::Communication(error.to_string())
    }
}
