//! The installation workflow.
//!
//! Builds and runs the task graph that stages the install script, pulls the
//! runner image, cycles the log stream, runs the privileged install
//! container, and cleans up afterwards:
//!
//! ```text
//! pull ─ write_file ─┬─ image ────────────┐
//!                    └─ close_stream ─ setup_stream ─ run ─┬─ close_logger
//!                                                          ├─ remove_install_script
//!                                                          └─ chown
//! ```
//!
//! The cleanup nodes are dependents of `run`, so a failed container run
//! skips them; a leftover scratch script or open log handle is absorbed by
//! the next run's `close_stream` node and truncate-on-open.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use roost_taskgraph::{TaskError, TaskGraph};

use crate::config::ProvisionerConfig;
use crate::error::InstallError;
use crate::logstream::LogStream;
use crate::request::{InstallationRequest, TemplateSpec, VariableBinding};
use crate::runtime::{ContainerRunSpec, ContainerRuntime, Mount, OutputSink};
use crate::workload::Workload;
use crate::workspace::Workspace;

/// How an installation run resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
  /// The install container ran and exited cleanly.
  Installed,
  /// The template defines no install script; nothing was run and the
  /// workload is free to boot.
  NoScript,
}

/// Value passed between graph nodes. Only `pull` resolves to something its
/// dependents read; every other node is a side effect.
#[derive(Clone)]
enum StepOutput {
  Template(Arc<TemplateSpec>),
  Done,
}

type StepGraph = TaskGraph<StepOutput, InstallError>;
type StepError = TaskError<InstallError>;

/// One installation run for one workload.
///
/// The request is immutable for the lifetime of the run; the boot-block gate
/// is set before any node executes and cleared only when the run resolves
/// successfully (or with [`InstallOutcome::NoScript`]). On fatal failure the
/// gate stays set and the workload remains unbootable.
pub struct Installer {
  request: Arc<InstallationRequest>,
  workload: Arc<dyn Workload>,
  runtime: Arc<dyn ContainerRuntime>,
  config: Arc<ProvisionerConfig>,
}

impl Installer {
  pub fn new(
    request: InstallationRequest,
    workload: Arc<dyn Workload>,
    runtime: Arc<dyn ContainerRuntime>,
    config: ProvisionerConfig,
  ) -> Self {
    Self {
      request: Arc::new(request),
      workload,
      runtime,
      config: Arc::new(config),
    }
  }

  /// Run the installation to completion or first unrecoverable failure.
  pub async fn run(&self) -> Result<InstallOutcome, InstallError> {
    info!(
      workload = %self.workload.id(),
      template = self.request.template.id,
      "blocking workload boot until installation completes"
    );
    self.workload.set_boot_blocked(true);

    let report = roost_taskgraph::run(self.build_graph()?).await;

    match report.failure {
      None => Ok(InstallOutcome::Installed),
      Some(failure) => match failure.error {
        TaskError::Halt { reason } => {
          info!(workload = %self.workload.id(), %reason, "installation skipped");
          // `run` never executed on this path, so the gate is cleared here.
          self.workload.set_boot_blocked(false);
          Ok(InstallOutcome::NoScript)
        }
        TaskError::Fail(err) => Err(err),
      },
    }
  }

  fn build_graph(&self) -> Result<StepGraph, InstallError> {
    let template_id = self.request.template.id;
    let workspace = Arc::new(Workspace::new(&self.config.scratch_root, self.workload.id()));
    let log_path = self
      .workload
      .storage_root()
      .join(format!("install{template_id}.log"));
    let stream = Arc::new(Mutex::new(LogStream::new(log_path)));

    let mut graph = StepGraph::new();

    // pull: the control plane already resolved the template and variable
    // bindings; hand the template to dependents.
    {
      let request = self.request.clone();
      let workload = self.workload.clone();
      graph.add_node("pull", &[], move |_| {
        let template = Arc::new(request.template.clone());
        debug!(workload = %workload.id(), "determining script to run for this installation");
        Box::pin(async move { Ok(StepOutput::Template(template)) })
      })?;
    }

    // write_file: normalize line endings and stage the script into the
    // scratch directory, or halt the run when the template has no installer.
    {
      let workspace = workspace.clone();
      let workload = self.workload.clone();
      graph.add_node("write_file", &["pull"], move |mut inputs| {
        let workspace = workspace.clone();
        let workload = workload.clone();
        let template = match inputs.remove("pull") {
          Some(StepOutput::Template(template)) => template,
          _ => unreachable!("pull resolves to the template"),
        };
        Box::pin(async move {
          let Some(script) = template.script.as_deref() else {
            return Err(StepError::halt(
              "no installation script was defined for this template, skipping rest of process",
            ));
          };
          let script = script.replace("\r\n", "\n");
          debug!(
            workload = %workload.id(),
            "writing install script to be handed into the container"
          );
          workspace
            .write_script(template.id, &script)
            .await
            .map_err(|err| TaskError::Fail(InstallError::Io(err)))?;
          Ok(StepOutput::Done)
        })
      })?;
    }

    // image: make sure the runner image is present locally.
    {
      let runtime = self.runtime.clone();
      let workload = self.workload.clone();
      let image = self.runner_image();
      graph.add_node("image", &["write_file"], move |_| {
        let runtime = runtime.clone();
        let workload = workload.clone();
        let image = image.clone();
        Box::pin(async move {
          debug!(
            workload = %workload.id(),
            image = %image,
            "pulling image if it is not already on the system"
          );
          runtime
            .pull_image(&image)
            .await
            .map_err(|err| TaskError::Fail(err.into()))?;
          Ok(StepOutput::Done)
        })
      })?;
    }

    // close_stream: discard a log stream left open by a previous attempt.
    {
      let stream = stream.clone();
      graph.add_node("close_stream", &["write_file"], move |_| {
        let stream = stream.clone();
        Box::pin(async move {
          let mut stream = stream.lock().await;
          if stream.is_open() {
            if let Err(err) = stream.close().await {
              warn!(error = %err, "failed to close leftover log stream");
            }
          }
          Ok(StepOutput::Done)
        })
      })?;
    }

    // setup_stream: open the durable install log under the workload's
    // storage root.
    {
      let stream = stream.clone();
      let workload = self.workload.clone();
      graph.add_node("setup_stream", &["close_stream"], move |_| {
        let stream = stream.clone();
        let workload = workload.clone();
        Box::pin(async move {
          let mut stream = stream.lock().await;
          info!(
            workload = %workload.id(),
            file = %stream.path().display(),
            "writing output of installation process to file"
          );
          stream
            .open()
            .await
            .map_err(|err| TaskError::Fail(InstallError::Io(err)))?;
          Ok(StepOutput::Done)
        })
      })?;
    }

    // run: the long pole. Launch the privileged install container with the
    // workload's storage and the scratch directory mounted, wait for it to
    // exit, and clear the boot gate on success.
    {
      let request = self.request.clone();
      let workload = self.workload.clone();
      let runtime = self.runtime.clone();
      let config = self.config.clone();
      let workspace = workspace.clone();
      let stream = stream.clone();
      let image = self.runner_image();
      let entrypoint = self.runner_entrypoint();
      graph.add_node("run", &["setup_stream", "image"], move |_| {
        let request = request.clone();
        let workload = workload.clone();
        let runtime = runtime.clone();
        let config = config.clone();
        let workspace = workspace.clone();
        let stream = stream.clone();
        let image = image.clone();
        let entrypoint = entrypoint.clone();
        Box::pin(async move {
          debug!(
            workload = %workload.id(),
            "running privileged container to perform the installation process"
          );

          let build = workload.build_params();
          let mut env = vec![
            format!("SERVER_MEMORY={}", build.memory),
            format!("SERVER_IP={}", build.ip),
            format!("SERVER_PORT={}", build.port),
          ];
          env.extend(request.variables.iter().map(VariableBinding::render));

          let spec = ContainerRunSpec {
            image,
            command: vec![
              entrypoint,
              format!("/mnt/install/install-{}.sh", request.template.id),
            ],
            env,
            mounts: vec![
              Mount {
                source: workload.storage_root().to_path_buf(),
                destination: "/mnt/server".into(),
                writable: true,
              },
              Mount {
                source: workspace.dir().to_path_buf(),
                destination: "/mnt/install".into(),
                writable: true,
              },
            ],
            // The template's own privilege request is deliberately ignored;
            // install containers always run privileged.
            privileged: true,
          };

          let exit = if config.debug_output {
            let mut console = tokio::io::stdout();
            runtime.run(spec, &mut console).await
          } else {
            let mut stream = stream.lock().await;
            match stream.sink() {
              Some(sink) => runtime.run(spec, sink as &mut OutputSink).await,
              None => Err(crate::error::RuntimeError::Run {
                reason: "install log stream is not open".to_string(),
              }),
            }
          };
          let exit = exit.map_err(|err| TaskError::Fail(err.into()))?;

          if let Some(handle) = exit.handle.as_deref() {
            if let Err(err) = runtime.remove(handle).await {
              warn!(error = %err, container = %handle, "failed to remove install container");
            }
          }

          if exit.status_code != 0 {
            return Err(TaskError::Fail(InstallError::ScriptExit(exit.status_code)));
          }

          info!(workload = %workload.id(), "completed installation process");
          workload.set_boot_blocked(false);
          Ok(StepOutput::Done)
        })
      })?;
    }

    // close_logger: release the install log handle.
    {
      let stream = stream.clone();
      graph.add_node("close_logger", &["run"], move |_| {
        let stream = stream.clone();
        Box::pin(async move {
          let mut stream = stream.lock().await;
          if stream.is_open() {
            if let Err(err) = stream.close().await {
              warn!(error = %err, "failed to close install log stream");
            }
          }
          Ok(StepOutput::Done)
        })
      })?;
    }

    // remove_install_script: drop the staged script from the scratch
    // directory. Best effort, like the other cleanup.
    {
      let workspace = workspace.clone();
      graph.add_node("remove_install_script", &["run"], move |_| {
        let workspace = workspace.clone();
        Box::pin(async move {
          if let Err(err) = workspace.remove_script(template_id).await {
            warn!(error = %err, "failed to remove install script");
          }
          Ok(StepOutput::Done)
        })
      })?;
    }

    // chown: hand ownership of everything the installer wrote back to the
    // workload's runtime user.
    {
      let workload = self.workload.clone();
      graph.add_node("chown", &["run"], move |_| {
        let workload = workload.clone();
        Box::pin(async move {
          debug!(
            workload = %workload.id(),
            "repairing file ownership across the storage root"
          );
          workload
            .repair_ownership()
            .await
            .map_err(|err| TaskError::Fail(InstallError::Ownership(err)))?;
          Ok(StepOutput::Done)
        })
      })?;
    }

    Ok(graph)
  }

  fn runner_image(&self) -> String {
    self
      .request
      .template
      .container
      .clone()
      .unwrap_or_else(|| self.config.default_image.clone())
  }

  fn runner_entrypoint(&self) -> String {
    self
      .request
      .template
      .entrypoint
      .clone()
      .unwrap_or_else(|| self.config.default_entrypoint.clone())
  }
}
