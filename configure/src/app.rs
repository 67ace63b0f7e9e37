use std::{env, io::Write, sync::MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::unbounded;
use trsync_config_core::{
    error::Error,
    instance::{InstanceId, WorkspaceId},
    job::{Event, Loader},
    registry::{Registry, SharedRegistry},
    selection::WorkspaceLists,
};

use crate::{
    display::{write_instance, write_lists, write_settings},
    opt::Command,
};

pub struct App {
    registry: SharedRegistry,
}

impl App {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Run initial load in background and wait for it : no command is accepted before
    pub fn load(&self, out: &mut dyn Write) -> Result<()> {
        let (event_sender, event_receiver) = unbounded();
        Loader::new(self.registry.clone(), event_sender)
            .start()
            .context("Start config loader")?;

        match event_receiver.recv().context("Wait config loader")? {
            Event::Loaded(errors) => {
                for (id, error) in errors {
                    write_warning(out, &id, &error)?;
                }
                Ok(())
            }
            Event::LoadFailed(message) => bail!("Unable to load configuration : {}", message),
        }
    }

    fn registry(&self) -> Result<MutexGuard<Registry>> {
        self.registry
            .lock()
            .map_err(|error| anyhow!("Unable to lock registry : {}", error))
    }

    pub fn execute(&self, command: Command, out: &mut dyn Write) -> Result<()> {
        let result = match command {
            Command::List => self.list(out),
            Command::Add {
                address,
                username,
                unsecure,
                env_var_pass,
            } => {
                let password = read_password(env_var_pass.as_deref(), true)?.unwrap_or_default();
                self.add(out, &address, &username, &password, unsecure)
            }
            Command::Update {
                instance,
                address,
                username,
                unsecure,
                env_var_pass,
                ask_password,
            } => {
                let password = read_password(env_var_pass.as_deref(), ask_password)?;
                self.update(
                    out,
                    &InstanceId(instance),
                    address,
                    username,
                    password,
                    unsecure.map(|toggle| toggle.0),
                )
            }
            Command::Delete { instance } => self.delete(out, &InstanceId(instance)),
            Command::Select {
                instance,
                workspaces,
            } => self.transfer(out, &InstanceId(instance), &workspaces, true),
            Command::Unselect {
                instance,
                workspaces,
            } => self.transfer(out, &InstanceId(instance), &workspaces, false),
            Command::SetWorkspaces { instance, ids } => {
                let ids: Vec<WorkspaceId> = ids.into_iter().map(WorkspaceId).collect();
                self.set_workspaces(out, &InstanceId(instance), &ids)
            }
            Command::LocalFolder { path } => {
                let path = path.display().to_string();
                self.registry()?
                    .set_local_folder(Some(path.clone()))
                    .context(format!("Set local folder to '{}'", path))?;
                writeln!(out, "Local folder is now '{}'", path)?;
                Ok(())
            }
            Command::PreventDeleteSync { value } => {
                self.registry()?
                    .set_prevent_delete_sync(value.0)
                    .context("Set prevent delete sync")?;
                writeln!(out, "Configuration saved")?;
                Ok(())
            }
        };

        // Errors which did not interrupt the command (ex. a refused password storage)
        for (id, error) in self.registry()?.take_errors() {
            write_warning(out, &id, &error)?;
        }

        result
    }

    fn list(&self, out: &mut dyn Write) -> Result<()> {
        let registry = self.registry()?;
        write_settings(out, registry.settings())?;

        if registry.instances().is_empty() {
            writeln!(out, "No instance configured")?;
        }
        for instance in registry.instances() {
            writeln!(out)?;
            write_instance(out, instance, registry.state(&instance.id()))?;
        }

        Ok(())
    }

    fn add(
        &self,
        out: &mut dyn Write,
        address: &str,
        username: &str,
        password: &str,
        unsecure: bool,
    ) -> Result<()> {
        let mut registry = self.registry()?;
        let id = registry
            .add(address, username, password, unsecure)
            .context(format!("Add instance '{}'", address))?;
        writeln!(out, "Instance '{}' correctly configured", id)?;

        if let Err(error) = registry.refresh(&id) {
            write_warning(out, &id, &error)?;
        }
        let instance = registry
            .instance(&id)
            .ok_or(anyhow!("Instance '{}' disappeared", id))?;
        write_instance(out, instance, registry.state(&id))?;

        Ok(())
    }

    fn update(
        &self,
        out: &mut dyn Write,
        id: &InstanceId,
        address: Option<String>,
        username: Option<String>,
        password: Option<String>,
        unsecure: Option<bool>,
    ) -> Result<()> {
        let mut registry = self.registry()?;
        let current = registry
            .instance(id)
            .ok_or(Error::NotFound(format!("Instance '{}'", id)))?
            .clone();

        let new_id = registry
            .update(
                id,
                &address.unwrap_or(current.address),
                &username.unwrap_or(current.username),
                &password.unwrap_or(current.password),
                unsecure.unwrap_or(current.unsecure),
            )
            .context(format!("Update instance '{}'", id))?;
        writeln!(out, "Instance '{}' updated", new_id)?;

        Ok(())
    }

    fn delete(&self, out: &mut dyn Write, id: &InstanceId) -> Result<()> {
        self.registry()?
            .delete(id)
            .context(format!("Delete instance '{}'", id))?;
        writeln!(
            out,
            "Instance '{}' deleted (files on your disk are not deleted)",
            id
        )?;
        Ok(())
    }

    /// Move given workspaces from a list to the other, then apply the selection
    fn transfer(
        &self,
        out: &mut dyn Write,
        id: &InstanceId,
        queries: &[String],
        select: bool,
    ) -> Result<()> {
        let mut registry = self.registry()?;
        let instance = registry
            .instance(id)
            .ok_or(Error::NotFound(format!("Instance '{}'", id)))?
            .clone();
        let mut lists = WorkspaceLists::from_instance(&instance);

        for query in queries {
            let moved = if select {
                lists.find_left(query).and_then(|index| lists.select(index))
            } else {
                lists.find_right(query).and_then(|index| lists.unselect(index))
            };
            if moved.is_none() {
                bail!(Error::NotFound(format!(
                    "Workspace '{}' in {} workspaces of '{}'",
                    query,
                    if select { "not synchronized" } else { "synchronized" },
                    id
                )));
            }
        }

        registry
            .set_enabled_workspaces(id, &lists.selected_ids(&instance))
            .context(format!("Save workspaces of '{}'", id))?;
        write_lists(out, &instance, &lists)?;

        Ok(())
    }

    fn set_workspaces(&self, out: &mut dyn Write, id: &InstanceId, ids: &[WorkspaceId]) -> Result<()> {
        let mut registry = self.registry()?;
        registry
            .set_enabled_workspaces(id, ids)
            .context(format!("Save workspaces of '{}'", id))?;
        let instance = registry
            .instance(id)
            .ok_or(anyhow!("Instance '{}' disappeared", id))?;
        write_instance(out, instance, registry.state(id))?;
        Ok(())
    }
}

fn write_warning(out: &mut dyn Write, id: &InstanceId, error: &Error) -> Result<()> {
    log::warn!("{} for '{}' : {}", error.category(), id, error);
    writeln!(out, "Warning: {} for '{}' : {}", error.category(), id, error)?;
    Ok(())
}

/// Password from given env var, or asked to user if `ask` is set
fn read_password(env_var_pass: Option<&str>, ask: bool) -> Result<Option<String>> {
    if let Some(env_var_pass) = env_var_pass {
        return Ok(Some(env::var(env_var_pass).context(format!(
            "No env var set for name {}",
            env_var_pass
        ))?));
    }

    if ask {
        return Ok(Some(
            rpassword::prompt_password("Password ? ").context("Read password")?,
        ));
    }

    Ok(None)
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use ini::Ini;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use trsync_config_core::{
        client::MockDirectoryClient,
        instance::{InstanceState, Workspace},
        user::UserId,
    };

    use super::*;

    const RAW_CONFIG: &str = "[server]
instances=demo.example.org
local_folder=/home/alice/Tracim

[instance.demo.example.org]
address=demo.example.org
username=alice
password=secret
unsecure=False
workspaces_ids=2,99
";

    fn client() -> MockDirectoryClient {
        let mut client = MockDirectoryClient::new();
        client
            .expect_check_credentials()
            .returning(|instance| {
                if instance.password == "secret" {
                    Ok(UserId(42))
                } else {
                    Err(Error::Authentication)
                }
            });
        client.expect_get_workspaces().returning(|_, _| {
            Ok(vec![
                Workspace::new(1, "Café"),
                Workspace::new(2, "Docs"),
                Workspace::new(3, "Projets"),
            ])
        });
        client
    }

    fn loaded_app(raw_config: &str) -> (TempDir, PathBuf, App) {
        let dir = tempfile::tempdir().unwrap();
        let config_file_path = dir.path().join("trsync.conf");
        fs::write(&config_file_path, raw_config).unwrap();
        let registry = Registry::new(config_file_path.clone(), Box::new(client())).shared();
        let app = App::new(registry);
        app.load(&mut vec![]).unwrap();
        (dir, config_file_path, app)
    }

    fn execute(app: &App, command: Command) -> (Result<()>, String) {
        let mut out = vec![];
        let result = app.execute(command, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_list() {
        // Given
        let (_dir, _, app) = loaded_app(RAW_CONFIG);

        // When
        let (result, output) = execute(&app, Command::List);

        // Then
        result.unwrap();
        assert!(output.contains("Local folder: /home/alice/Tracim"));
        assert!(output.contains("demo.example.org (alice, https, saved)"));
        assert!(output.contains("    [2] Docs"));
        assert!(output.contains("Selected but unknown by server: 99"));
    }

    #[test]
    fn test_select_by_name_and_id() {
        // Given
        let (_dir, config_file_path, app) = loaded_app(RAW_CONFIG);

        // When
        let (result, _) = execute(
            &app,
            Command::Select {
                instance: "demo.example.org".to_string(),
                workspaces: vec!["Café".to_string(), "3".to_string()],
            },
        );

        // Then
        result.unwrap();
        let config_ini = Ini::load_from_file(&config_file_path).unwrap();
        assert_eq!(
            config_ini.get_from(Some("instance.demo.example.org"), "workspaces_ids"),
            Some("2,1,3,99")
        );
    }

    #[test]
    fn test_unselect_unknown_workspace() {
        // Given
        let (_dir, config_file_path, app) = loaded_app(RAW_CONFIG);

        // When
        let (result, _) = execute(
            &app,
            Command::Unselect {
                instance: "demo.example.org".to_string(),
                workspaces: vec!["Café".to_string()],
            },
        );

        // Then
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::NotFound(_))
        ));
        assert_eq!(fs::read_to_string(&config_file_path).unwrap(), RAW_CONFIG);
    }

    #[test]
    fn test_add_with_env_var_password() {
        // Given
        let (_dir, config_file_path, app) = loaded_app(RAW_CONFIG);
        env::set_var("TRSYNC_CONFIGURE_TEST_ADD_PASSWORD", "secret");

        // When
        let (result, output) = execute(
            &app,
            Command::Add {
                address: "other.example.org".to_string(),
                username: "bob".to_string(),
                unsecure: true,
                env_var_pass: Some("TRSYNC_CONFIGURE_TEST_ADD_PASSWORD".to_string()),
            },
        );

        // Then
        result.unwrap();
        assert!(output.contains("Instance 'other.example.org' correctly configured"));
        assert!(output.contains("other.example.org (bob, http, saved)"));
        let config_ini = Ini::load_from_file(&config_file_path).unwrap();
        assert_eq!(
            config_ini.get_from(Some("server"), "instances"),
            Some("demo.example.org,other.example.org")
        );
    }

    #[test]
    fn test_add_refused() {
        // Given
        let (_dir, _, app) = loaded_app(RAW_CONFIG);
        env::set_var("TRSYNC_CONFIGURE_TEST_REFUSED_PASSWORD", "wrong");

        // When
        let (result, _) = execute(
            &app,
            Command::Add {
                address: "other.example.org".to_string(),
                username: "bob".to_string(),
                unsecure: false,
                env_var_pass: Some("TRSYNC_CONFIGURE_TEST_REFUSED_PASSWORD".to_string()),
            },
        );

        // Then
        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::Authentication)
        ));
    }

    #[test]
    fn test_update_keep_unspecified_fields() {
        // Given
        let (_dir, config_file_path, app) = loaded_app(RAW_CONFIG);

        // When
        let (result, _) = execute(
            &app,
            Command::Update {
                instance: "demo.example.org".to_string(),
                address: None,
                username: Some("alice2".to_string()),
                unsecure: None,
                env_var_pass: None,
                ask_password: false,
            },
        );

        // Then
        result.unwrap();
        let config_ini = Ini::load_from_file(&config_file_path).unwrap();
        assert_eq!(
            config_ini.get_from(Some("instance.demo.example.org"), "username"),
            Some("alice2")
        );
        assert_eq!(
            config_ini.get_from(Some("instance.demo.example.org"), "password"),
            Some("secret")
        );
    }

    #[test]
    fn test_delete() {
        // Given
        let (_dir, config_file_path, app) = loaded_app(RAW_CONFIG);

        // When
        let (result, _) = execute(
            &app,
            Command::Delete {
                instance: "demo.example.org".to_string(),
            },
        );

        // Then
        result.unwrap();
        let config_ini = Ini::load_from_file(&config_file_path).unwrap();
        assert_eq!(config_ini.get_from(Some("server"), "instances"), Some(""));
        assert!(config_ini.section(Some("instance.demo.example.org")).is_none());
        assert_eq!(
            app.registry()
                .unwrap()
                .state(&InstanceId::from("demo.example.org")),
            InstanceState::Deleted
        );
    }

    #[test]
    fn test_load_report_unreachable_instance() {
        // Given
        let dir = tempfile::tempdir().unwrap();
        let config_file_path = dir.path().join("trsync.conf");
        fs::write(&config_file_path, RAW_CONFIG.replace("password=secret", "password=old")).unwrap();
        let app = App::new(Registry::new(config_file_path, Box::new(client())).shared());
        let mut out = vec![];

        // When
        app.load(&mut out).unwrap();

        // Then
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Warning: Authentication error for 'demo.example.org' : Authentication error\n"
        );
    }
}
