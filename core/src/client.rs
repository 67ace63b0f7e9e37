use std::time::Duration;

use mockall::automock;
use reqwest::Method;
use serde_json::Value;

use crate::{
    error::Error,
    instance::{Instance, Workspace},
    user::UserId,
};

pub const CONNECT_TIMEOUT: u64 = 10;
pub const WHOAMI_TIMEOUT: u64 = 60;
pub const WORKSPACES_TIMEOUT: u64 = 120;

/// Remote directory of an instance : who is the user and which workspaces he can reach.
/// Each call is one request, never retried.
#[automock]
pub trait DirectoryClient {
    fn check_credentials(&self, instance: &Instance) -> Result<UserId, Error>;
    fn get_workspaces(&self, instance: &Instance, user_id: UserId)
        -> Result<Vec<Workspace>, Error>;
}

/// Credentials check followed by workspaces listing
pub fn fetch_workspaces(
    client: &dyn DirectoryClient,
    instance: &Instance,
) -> Result<Vec<Workspace>, Error> {
    let user_id = client.check_credentials(instance)?;
    client.get_workspaces(instance, user_id)
}

pub struct HttpDirectoryClient {
    client: reqwest::blocking::Client,
}

impl HttpDirectoryClient {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT))
            .build()?;
        Ok(Self { client })
    }
}

impl DirectoryClient for HttpDirectoryClient {
    fn check_credentials(&self, instance: &Instance) -> Result<UserId, Error> {
        let url = instance.url(Some("/auth/whoami"));
        log::debug!("Check credentials of '{}' at url '{}'", instance.username, url);
        let response = self
            .client
            .request(Method::GET, url)
            .basic_auth(&instance.username, Some(&instance.password))
            .timeout(Duration::from_secs(WHOAMI_TIMEOUT))
            .send()?;

        let status_code = response.status().as_u16();
        if status_code != 200 {
            log::debug!(
                "Credentials of '{}' refused by '{}' (status {})",
                instance.username,
                instance.address,
                status_code
            );
            return Err(Error::Authentication);
        }

        let value = response.json::<Value>()?;
        let user_id = value["user_id"]
            .as_i64()
            .and_then(|user_id| i32::try_from(user_id).ok())
            .ok_or(Error::Communication(format!(
                "Response user_id seems not be an integer: '{}'",
                value
            )))?;
        Ok(UserId(user_id))
    }

    fn get_workspaces(
        &self,
        instance: &Instance,
        user_id: UserId,
    ) -> Result<Vec<Workspace>, Error> {
        let url = instance.url(Some(format!("/users/{}/workspaces", user_id).as_str()));
        log::debug!("Get workspaces at url '{}'", url);
        let response = self
            .client
            .request(Method::GET, url)
            .basic_auth(&instance.username, Some(&instance.password))
            .timeout(Duration::from_secs(WORKSPACES_TIMEOUT))
            .send()?;

        let status_code = response.status().as_u16();
        match status_code {
            200 => Ok(response.json::<Vec<Workspace>>()?),
            _ => Err(Error::Communication(format!(
                "Server response status code was : {}",
                status_code
            ))),
        }
    }
}
