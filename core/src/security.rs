use std::time::Duration;

use mockall::automock;
use reqwest::Method;

use crate::error::Error;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
pub const DEFAULT_PASSWORD_SETTER_TIMEOUT: u64 = 10;

/// Secret storage delegated outside the config file, keyed by instance address
#[automock]
pub trait PasswordStore {
    fn get_password(&self, instance_address: &str) -> Result<String, Error>;
    fn set_password(&self, instance_address: &str, password: &str) -> Result<(), Error>;
}

/// Client of the local password setter service
pub struct PasswordSetterClient {
    base_url: String,
    token: String,
    client: reqwest::blocking::Client,
}

impl PasswordSetterClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_PASSWORD_SETTER_TIMEOUT))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    pub fn on_loopback(port: u16, token: &str) -> Result<Self, Error> {
        Self::new(&format!("http://127.0.0.1:{}", port), token)
    }

    fn url(&self, instance_address: &str) -> String {
        format!("{}/password/{}", self.base_url, instance_address)
    }
}

impl PasswordStore for PasswordSetterClient {
    fn get_password(&self, instance_address: &str) -> Result<String, Error> {
        log::info!("Get password of '{}' from password setter", instance_address);
        let fail = |message: String| Error::FailToGetPassword(instance_address.to_string(), message);
        let response = self
            .client
            .request(Method::GET, self.url(instance_address))
            .header(AUTH_TOKEN_HEADER, &self.token)
            .send()
            .map_err(|error| fail(error.to_string()))?;

        let status_code = response.status().as_u16();
        if status_code != 200 {
            return Err(fail(format!("Response status code was : {}", status_code)));
        }

        response.text().map_err(|error| fail(error.to_string()))
    }

    fn set_password(&self, instance_address: &str, password: &str) -> Result<(), Error> {
        log::info!("Store password of '{}' with password setter", instance_address);
        let fail = |message: String| Error::FailToSetPassword(instance_address.to_string(), message);
        let response = self
            .client
            .request(Method::POST, self.url(instance_address))
            .header(AUTH_TOKEN_HEADER, &self.token)
            .body(password.to_string())
            .send()
            .map_err(|error| fail(error.to_string()))?;

        match response.status().as_u16() {
            201 => Ok(()),
            status_code => Err(fail(format!("Response status code was : {}", status_code))),
        }
    }
}
