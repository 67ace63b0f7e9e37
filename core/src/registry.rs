use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use crate::{
    client::{fetch_workspaces, DirectoryClient},
    config::{Config, InstanceConfig, ServerSettings},
    error::Error,
    instance::{Instance, InstanceId, InstanceState, Workspace, WorkspaceId},
    security::PasswordStore,
};

/// Registry is shared between the background loader and the foreground, every
/// access goes through this lock
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Characters which can't appear in an instance address (`host` or `host:port`): they
/// would break the `instances` list or the section name of the config file
const ADDRESS_FORBIDDEN_CHARS: [char; 4] = [',', '[', ']', '/'];

/// In memory state before a mutation, put back when the mutation can't be persisted
struct Snapshot {
    settings: ServerSettings,
    instances: Vec<Instance>,
    states: HashMap<InstanceId, InstanceState>,
}

/// Owner of configured instances. Every mutation is persisted immediately.
pub struct Registry {
    config_file_path: PathBuf,
    settings: ServerSettings,
    instances: Vec<Instance>,
    states: HashMap<InstanceId, InstanceState>,
    errors: Vec<(InstanceId, Error)>,
    client: Box<dyn DirectoryClient + Send>,
    password_store: Option<Box<dyn PasswordStore + Send>>,
}

impl Registry {
    pub fn new(config_file_path: PathBuf, client: Box<dyn DirectoryClient + Send>) -> Self {
        Self {
            config_file_path,
            settings: ServerSettings::default(),
            instances: vec![],
            states: HashMap::new(),
            errors: vec![],
            client,
            password_store: None,
        }
    }

    /// Passwords will be read from and written to this store instead of config file
    pub fn with_password_store(mut self, password_store: Box<dyn PasswordStore + Send>) -> Self {
        self.password_store = Some(password_store);
        self
    }

    pub fn shared(self) -> SharedRegistry {
        Arc::new(Mutex::new(self))
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_file_path
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances.iter().find(|i| &i.id() == id)
    }

    pub fn state(&self, id: &InstanceId) -> InstanceState {
        self.states
            .get(id)
            .copied()
            .unwrap_or(InstanceState::Unconfigured)
    }

    pub fn password_delegated(&self) -> bool {
        self.password_store.is_some()
    }

    /// Drain errors which did not interrupt an operation (instance load failure, password
    /// storage failure)
    pub fn take_errors(&mut self) -> Vec<(InstanceId, Error)> {
        std::mem::take(&mut self.errors)
    }

    fn position(&self, id: &InstanceId) -> Result<usize, Error> {
        self.instances
            .iter()
            .position(|i| &i.id() == id)
            .ok_or(Error::NotFound(format!("Instance '{}'", id)))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            settings: self.settings.clone(),
            instances: self.instances.clone(),
            states: self.states.clone(),
        }
    }

    /// Persist a mutation. If config file can't be written, memory is restored as
    /// before the mutation so it stays equal to the file.
    fn save_or_restore(&mut self, snapshot: Snapshot) -> Result<(), Error> {
        if let Err(error) = self.save() {
            log::error!("Unable to save config, restore previous state : {}", error);
            self.settings = snapshot.settings;
            self.instances = snapshot.instances;
            self.states = snapshot.states;
            return Err(error);
        }

        Ok(())
    }

    fn add_error(&mut self, id: InstanceId, error: Error) {
        log::error!("Error for instance '{}' : {}", id, error);
        self.errors.push((id, error));
    }

    /// Replace in memory state by config file content, then retrieve each instance
    /// workspaces. An instance which can't be reached is kept (without workspaces) and
    /// its error is available with `take_errors`.
    pub fn load(&mut self) -> Result<(), Error> {
        log::info!("Load config from '{}'", self.config_file_path.display());
        let config = Config::read(&self.config_file_path)?;

        self.settings = config.server;
        self.instances.clear();
        self.states.clear();

        for instance_config in config.instances {
            let id = InstanceId(instance_config.address.clone());
            if self.states.contains_key(&id) {
                log::warn!("Instance '{}' is configured twice, ignore it", id);
                continue;
            }

            let instance = self.load_instance(instance_config);
            self.states.insert(id, InstanceState::Saved);
            self.instances.push(instance);
        }

        log::info!("{} instance(s) loaded", self.instances.len());
        Ok(())
    }

    fn load_instance(&mut self, instance_config: InstanceConfig) -> Instance {
        let mut instance = Instance::new(
            &instance_config.address,
            &instance_config.username,
            "",
            instance_config.unsecure,
        );
        instance.enabled_workspaces = instance_config.workspaces_ids;

        let password = match &self.password_store {
            Some(password_store) => password_store.get_password(&instance.address),
            None => instance_config.password.ok_or(Error::ReadConfig(format!(
                "Missing password of instance '{}'",
                instance.address
            ))),
        };
        match password {
            Ok(password) => instance.password = password,
            Err(error) => {
                self.add_error(instance.id(), error);
                return instance;
            }
        }

        log::info!("Retrieve workspaces of '{}'", instance.address);
        match fetch_workspaces(self.client.as_ref(), &instance) {
            Ok(workspaces) => instance.all_workspaces = workspaces,
            Err(error) => self.add_error(instance.id(), error),
        }

        instance
    }

    /// Register a new instance after its credentials are accepted by remote
    pub fn add(
        &mut self,
        address: &str,
        username: &str,
        password: &str,
        unsecure: bool,
    ) -> Result<InstanceId, Error> {
        let instance = Instance::new(address.trim(), username.trim(), password, unsecure);
        check_complete(&instance)?;
        let id = instance.id();
        if self.position(&id).is_ok() {
            return Err(Error::InstanceAlreadyExist(id.to_string()));
        }

        self.client.check_credentials(&instance)?;

        log::info!("Add instance '{}'", id);
        let snapshot = self.snapshot();
        self.instances.push(instance);
        self.states.insert(id.clone(), InstanceState::Pending);
        self.save_or_restore(snapshot)?;

        Ok(id)
    }

    /// Fetch again instance workspaces list (credentials check included)
    pub fn refresh(&mut self, id: &InstanceId) -> Result<&[Workspace], Error> {
        let position = self.position(id)?;
        log::info!("Retrieve workspaces of '{}'", id);
        let workspaces = fetch_workspaces(self.client.as_ref(), &self.instances[position])?;
        self.instances[position].all_workspaces = workspaces;
        Ok(&self.instances[position].all_workspaces)
    }

    /// Change instance connection information. Credentials are not checked, workspaces are
    /// not refreshed. Returned id change if address changed.
    pub fn update(
        &mut self,
        id: &InstanceId,
        address: &str,
        username: &str,
        password: &str,
        unsecure: bool,
    ) -> Result<InstanceId, Error> {
        let position = self.position(id)?;
        let new_id = InstanceId(address.trim().to_string());
        if &new_id != id && self.position(&new_id).is_ok() {
            return Err(Error::InstanceAlreadyExist(new_id.to_string()));
        }

        let mut instance = self.instances[position].clone();
        instance.address = address.trim().to_string();
        instance.username = username.trim().to_string();
        instance.password = password.to_string();
        instance.unsecure = unsecure;
        check_complete(&instance)?;

        log::info!("Update instance '{}'", id);
        let snapshot = self.snapshot();
        self.instances[position] = instance;
        self.states.remove(id);
        self.states.insert(new_id.clone(), InstanceState::Pending);
        self.save_or_restore(snapshot)?;

        Ok(new_id)
    }

    pub fn delete(&mut self, id: &InstanceId) -> Result<Instance, Error> {
        let position = self.position(id)?;

        log::info!("Delete instance '{}'", id);
        let snapshot = self.snapshot();
        let instance = self.instances.remove(position);
        self.states.insert(id.clone(), InstanceState::Deleted);
        self.save_or_restore(snapshot)?;

        Ok(instance)
    }

    /// Replace selected workspaces. Ids unknown by last fetched workspaces are kept.
    pub fn set_enabled_workspaces(
        &mut self,
        id: &InstanceId,
        ids: &[WorkspaceId],
    ) -> Result<(), Error> {
        let position = self.position(id)?;

        log::info!("Set enabled workspaces of '{}'", id);
        let snapshot = self.snapshot();
        self.instances[position].set_enabled_workspaces(ids);
        self.states.insert(id.clone(), InstanceState::Pending);
        self.save_or_restore(snapshot)
    }

    pub fn set_local_folder(&mut self, local_folder: Option<String>) -> Result<(), Error> {
        log::info!("Set local folder to {:?}", local_folder);
        let snapshot = self.snapshot();
        self.settings.local_folder = local_folder;
        self.save_or_restore(snapshot)
    }

    pub fn set_prevent_delete_sync(&mut self, value: bool) -> Result<(), Error> {
        log::info!("Set prevent delete sync to {}", value);
        let snapshot = self.snapshot();
        self.settings.prevent_delete_sync = value;
        self.save_or_restore(snapshot)
    }

    pub fn to_config(&self) -> Config {
        let delegated = self.password_delegated();
        Config {
            server: self.settings.clone(),
            instances: self
                .instances
                .iter()
                .map(|instance| InstanceConfig {
                    address: instance.address.clone(),
                    username: instance.username.clone(),
                    password: if delegated {
                        None
                    } else {
                        Some(instance.password.clone())
                    },
                    unsecure: instance.unsecure,
                    workspaces_ids: instance.enabled_workspaces.clone(),
                })
                .collect(),
        }
    }

    /// Write every instance to config file (and change marker). When passwords are
    /// delegated, a refused password is recorded as error but other instances are saved.
    pub fn save(&mut self) -> Result<(), Error> {
        let mut password_failures = vec![];
        if let Some(password_store) = &self.password_store {
            for instance in &self.instances {
                if instance.password.is_empty() {
                    log::warn!(
                        "Password of '{}' is unknown, don't send it to password setter",
                        instance.address
                    );
                    continue;
                }
                if let Err(error) = password_store.set_password(&instance.address, &instance.password)
                {
                    password_failures.push((instance.id(), error));
                }
            }
        }

        let failed_ids: Vec<InstanceId> = password_failures.iter().map(|(id, _)| id.clone()).collect();
        for (id, error) in password_failures {
            self.add_error(id, error);
        }

        self.to_config().write(&self.config_file_path)?;

        for instance in &self.instances {
            let id = instance.id();
            let state = if failed_ids.contains(&id) {
                InstanceState::Pending
            } else {
                InstanceState::Saved
            };
            self.states.insert(id, state);
        }

        Ok(())
    }
}

fn check_complete(instance: &Instance) -> Result<(), Error> {
    let mut missing = vec![];

    if instance.address.is_empty() {
        missing.push("address".to_string());
    }

    if instance.username.is_empty() {
        missing.push("username".to_string());
    }

    if instance.password.trim().is_empty() {
        missing.push("password".to_string());
    }

    if !missing.is_empty() {
        return Err(Error::IncompleteInstance(missing));
    }

    if instance.address.contains(|c: char| {
        c.is_whitespace() || ADDRESS_FORBIDDEN_CHARS.contains(&c)
    }) {
        return Err(Error::InvalidInstance(format!(
            "address '{}', expected host or host:port (without scheme)",
            instance.address
        )));
    }

    // Config file values are read trimmed
    if instance.password.trim() != instance.password {
        return Err(Error::InvalidInstance(
            "password, it must not start or end with spaces".to_string(),
        ));
    }

    Ok(())
}
