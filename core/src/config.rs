use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use ini::{Ini, ParseOption};
use tempfile::NamedTempFile;

use crate::{
    error::Error,
    instance::WorkspaceId,
    utils::{boolstr, join_workspaces_ids, parse_workspaces_ids, split_list, strbool},
};

pub const SERVER_SECTION: &str = "server";
pub const INSTANCE_SECTION_PREFIX: &str = "instance.";
pub const TRACK_FILE_SUFFIX: &str = ".track";
const SERVER_KNOWN_KEYS: [&str; 3] = ["instances", "local_folder", "prevent_delete_sync"];

pub fn default_config_file_path() -> Result<PathBuf, Error> {
    let user_home_folder_path = dirs::home_dir().ok_or(Error::UnableToFindHomeUser)?;
    if cfg!(target_os = "windows") {
        Ok(user_home_folder_path
            .join("AppData")
            .join("Local")
            .join("trsync.conf"))
    } else {
        Ok(user_home_folder_path.join(".trsync.conf"))
    }
}

/// Change marker file, next to the config file
pub fn track_file_path(config_file_path: &Path) -> PathBuf {
    let mut raw = config_file_path.as_os_str().to_os_string();
    raw.push(TRACK_FILE_SUFFIX);
    PathBuf::from(raw)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub local_folder: Option<String>,
    pub prevent_delete_sync: bool,
    /// Other keys of server section (used by other tools), kept as is
    pub extra: Vec<(String, String)>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            local_folder: None,
            prevent_delete_sync: true,
            extra: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub address: String,
    pub username: String,
    /// None when password is stored by the password setter
    pub password: Option<String>,
    pub unsecure: bool,
    pub workspaces_ids: Vec<WorkspaceId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server: ServerSettings,
    pub instances: Vec<InstanceConfig>,
}

impl Config {
    /// Read config file. An absent file is an empty config (first start).
    pub fn read(config_file_path: &Path) -> Result<Self, Error> {
        if !config_file_path.exists() {
            log::info!(
                "Config file '{}' does not exist yet, start from empty config",
                config_file_path.display()
            );
            return Ok(Self::default());
        }

        // Quotes are part of values (passwords can contain them)
        let parse_option = ParseOption {
            enabled_quote: false,
            enabled_escape: true,
        };
        let config_ini = Ini::load_from_file_opt(config_file_path, parse_option).map_err(|error| {
            Error::ReadConfig(format!(
                "Unable to read or load '{}' config file : {}",
                config_file_path.display(),
                error
            ))
        })?;
        Self::from_ini(&config_ini)
    }

    pub fn from_ini(config_ini: &Ini) -> Result<Self, Error> {
        let mut server = ServerSettings::default();
        let mut instances_names = vec![];

        if let Some(server_section) = config_ini.section(Some(SERVER_SECTION)) {
            instances_names = split_list(server_section.get("instances").unwrap_or(""));
            server.local_folder = server_section.get("local_folder").map(|v| v.to_string());
            server.prevent_delete_sync =
                strbool(server_section.get("prevent_delete_sync").unwrap_or("1"));
            server.extra = server_section
                .iter()
                .filter(|(key, _)| !SERVER_KNOWN_KEYS.contains(key))
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect();
        }

        let mut instances = vec![];
        for instance_name in instances_names {
            let section_name = format!("{}{}", INSTANCE_SECTION_PREFIX, instance_name);
            let section = config_ini
                .section(Some(section_name.as_str()))
                .ok_or(Error::ReadConfig(format!(
                    "Missing '{}' section in config",
                    section_name
                )))?;
            let address = section
                .get("address")
                .ok_or(Error::ReadConfig(format!(
                    "Unable to read address config from '{}' section",
                    section_name
                )))?
                .to_string();
            let username = section
                .get("username")
                .ok_or(Error::ReadConfig(format!(
                    "Unable to read username config from '{}' section",
                    section_name
                )))?
                .to_string();
            let password = section.get("password").map(|v| v.to_string());
            let unsecure = strbool(section.get("unsecure").unwrap_or("0"));
            let workspaces_ids = parse_workspaces_ids(section.get("workspaces_ids").unwrap_or(""))
                .map_err(|raw| {
                    Error::ReadConfig(format!(
                        "Invalid workspace id '{}' in '{}' section",
                        raw, section_name
                    ))
                })?;

            instances.push(InstanceConfig {
                address,
                username,
                password,
                unsecure,
                workspaces_ids,
            })
        }

        Ok(Self { server, instances })
    }

    pub fn to_ini(&self) -> Ini {
        let mut config_ini = Ini::new();

        let instances = self
            .instances
            .iter()
            .map(|i| i.address.clone())
            .collect::<Vec<String>>()
            .join(",");
        config_ini
            .with_section(Some(SERVER_SECTION))
            .set("instances", instances);
        if let Some(local_folder) = &self.server.local_folder {
            config_ini
                .with_section(Some(SERVER_SECTION))
                .set("local_folder", local_folder);
        }
        config_ini.with_section(Some(SERVER_SECTION)).set(
            "prevent_delete_sync",
            if self.server.prevent_delete_sync {
                "1"
            } else {
                "0"
            },
        );
        for (key, value) in &self.server.extra {
            config_ini
                .with_section(Some(SERVER_SECTION))
                .set(key, value);
        }

        for instance in &self.instances {
            let section_name = format!("{}{}", INSTANCE_SECTION_PREFIX, instance.address);
            config_ini
                .with_section(Some(section_name.as_str()))
                .set("address", &instance.address)
                .set("username", &instance.username);
            if let Some(password) = &instance.password {
                config_ini
                    .with_section(Some(section_name.as_str()))
                    .set("password", password);
            }
            config_ini
                .with_section(Some(section_name.as_str()))
                .set("unsecure", boolstr(instance.unsecure))
                .set("workspaces_ids", join_workspaces_ids(&instance.workspaces_ids));
        }

        config_ini
    }

    /// Replace config file content in one rename, then touch the change marker
    pub fn write(&self, config_file_path: &Path) -> Result<(), Error> {
        let folder = match config_file_path.parent() {
            Some(folder) if !folder.as_os_str().is_empty() => folder.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&folder).map_err(|error| {
            Error::WriteConfig(format!(
                "Unable to create folder '{}' : {}",
                folder.display(),
                error
            ))
        })?;

        let mut temporary_file = NamedTempFile::new_in(&folder).map_err(|error| {
            Error::WriteConfig(format!(
                "Unable to create temporary file in '{}' : {}",
                folder.display(),
                error
            ))
        })?;
        self.to_ini()
            .write_to(&mut temporary_file)
            .and_then(|_| temporary_file.flush())
            .map_err(|error| {
                Error::WriteConfig(format!("Unable to write temporary config : {}", error))
            })?;
        temporary_file
            .persist(config_file_path)
            .map_err(|error| {
                Error::WriteConfig(format!(
                    "Unable to replace '{}' : {}",
                    config_file_path.display(),
                    error
                ))
            })?;

        let track_file_path = track_file_path(config_file_path);
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&track_file_path)
            .map_err(|error| {
                Error::WriteConfig(format!(
                    "Unable to write change marker '{}' : {}",
                    track_file_path.display(),
                    error
                ))
            })?;

        log::info!("Config written to '{}'", config_file_path.display());
        Ok(())
    }
}
