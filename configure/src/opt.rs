use std::{path::PathBuf, str::FromStr};

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "trsync_configure",
    about = "Configure trsync instances and their synchronized workspaces"
)]
pub struct Opt {
    /// Config file path (default is user home trsync.conf)
    #[structopt(long, env = "TRSYNC_CONFIG", parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Port of local password setter service, passwords are not written in config file
    #[structopt(long, env = "TRSYNC_PASSWORD_SETTER_PORT")]
    pub password_setter_port: Option<u16>,

    #[structopt(long, env = "TRSYNC_PASSWORD_SETTER_TOKEN", hide_env_values = true)]
    pub password_setter_token: Option<String>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Display configuration, instances and their workspaces
    List,
    /// Add an instance, its credentials are checked before
    Add {
        /// Address, without scheme (ex. mon.tracim.fr)
        address: String,
        /// Username or email
        username: String,
        /// Use http instead https
        #[structopt(long)]
        unsecure: bool,
        /// Read password from this env var instead of asking it
        #[structopt(long)]
        env_var_pass: Option<String>,
    },
    /// Change instance connection information
    Update {
        instance: String,
        #[structopt(long)]
        address: Option<String>,
        #[structopt(long)]
        username: Option<String>,
        /// true to use http, false to use https
        #[structopt(long)]
        unsecure: Option<Toggle>,
        #[structopt(long)]
        env_var_pass: Option<String>,
        #[structopt(long)]
        ask_password: bool,
    },
    /// Remove an instance (local files are not deleted)
    Delete { instance: String },
    /// Synchronize workspaces, given by id or name
    Select {
        instance: String,
        #[structopt(required = true)]
        workspaces: Vec<String>,
    },
    /// Stop synchronizing workspaces, given by id or name
    Unselect {
        instance: String,
        #[structopt(required = true)]
        workspaces: Vec<String>,
    },
    /// Replace synchronized workspaces by given ids
    SetWorkspaces { instance: String, ids: Vec<i32> },
    /// Set local synchronization folder
    LocalFolder {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    /// Don't propagate local deletions to remote at startup
    PreventDeleteSync { value: Toggle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle(pub bool);

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" | "True" | "t" | "T" | "1" | "on" => Ok(Self(true)),
            "false" | "False" | "f" | "F" | "0" | "off" => Ok(Self(false)),
            _ => Err(format!("'{}' is not a boolean (true or false)", s)),
        }
    }
}
