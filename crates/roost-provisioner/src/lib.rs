//! Roost Provisioner
//!
//! Installation workflow for roost workloads. When a workload is first
//! created or has its template changed, the daemon runs the template's
//! install script inside an ephemeral privileged container: the script is
//! staged into a per-workload scratch directory, the runner image is pulled,
//! the workload's storage and the scratch directory are mounted, connection
//! parameters are injected as environment variables, and all output is
//! captured to a durable log file. The workload's boot gate stays set until
//! the run resolves, so a half-installed workload can never boot.
//!
//! The container runtime and the workload handle are injected capabilities
//! ([`ContainerRuntime`], [`Workload`]), so the workflow can be driven
//! against fakes in tests and against the Docker CLI ([`DockerCli`]) in a
//! deployment.

mod config;
mod docker;
mod error;
mod installer;
mod logstream;
mod request;
mod runtime;
mod workload;
mod workspace;

pub use config::ProvisionerConfig;
pub use docker::DockerCli;
pub use error::{InstallError, RuntimeError};
pub use installer::{InstallOutcome, Installer};
pub use logstream::LogStream;
pub use request::{InstallationRequest, TemplateSpec, VariableBinding};
pub use runtime::{ContainerExit, ContainerRunSpec, ContainerRuntime, Mount, OutputSink};
pub use workload::{BuildParams, LocalWorkload, Workload};
pub use workspace::Workspace;
