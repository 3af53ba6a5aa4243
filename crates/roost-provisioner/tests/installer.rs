//! Integration tests driving the installer with fake collaborators.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use roost_provisioner::{
  BuildParams, ContainerExit, ContainerRunSpec, ContainerRuntime, InstallError, InstallOutcome,
  InstallationRequest, Installer, LocalWorkload, OutputSink, ProvisionerConfig, RuntimeError,
  TemplateSpec, VariableBinding, Workload,
};

/// Recording container runtime with scripted behavior.
struct FakeRuntime {
  exit_code: i64,
  handle: Option<String>,
  output: Vec<u8>,
  fail_pull: bool,
  pulled: Mutex<Vec<String>>,
  runs: Mutex<Vec<ContainerRunSpec>>,
  removed: Mutex<Vec<String>>,
  /// Contents of the staged script as seen at container start.
  script_snapshot: Mutex<Option<String>>,
}

impl Default for FakeRuntime {
  fn default() -> Self {
    Self {
      exit_code: 0,
      handle: None,
      output: b"install output\n".to_vec(),
      fail_pull: false,
      pulled: Mutex::new(Vec::new()),
      runs: Mutex::new(Vec::new()),
      removed: Mutex::new(Vec::new()),
      script_snapshot: Mutex::new(None),
    }
  }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
  async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
    if self.fail_pull {
      return Err(RuntimeError::Pull {
        image: image.to_string(),
        reason: "registry unreachable".to_string(),
      });
    }
    self.pulled.lock().unwrap().push(image.to_string());
    Ok(())
  }

  async fn run(
    &self,
    spec: ContainerRunSpec,
    sink: &mut OutputSink,
  ) -> Result<ContainerExit, RuntimeError> {
    // Read the staged script the way the real container entrypoint would.
    if let Some(script_arg) = spec.command.get(1)
      && let Some(name) = Path::new(script_arg).file_name()
      && let Some(mount) = spec
        .mounts
        .iter()
        .find(|mount| mount.destination == Path::new("/mnt/install"))
    {
      let contents = tokio::fs::read_to_string(mount.source.join(name)).await?;
      *self.script_snapshot.lock().unwrap() = Some(contents);
    }

    sink.write_all(&self.output).await?;
    self.runs.lock().unwrap().push(spec);
    Ok(ContainerExit {
      status_code: self.exit_code,
      handle: self.handle.clone(),
    })
  }

  async fn remove(&self, handle: &str) -> Result<(), RuntimeError> {
    self.removed.lock().unwrap().push(handle.to_string());
    Ok(())
  }
}

struct Fixture {
  scratch: tempfile::TempDir,
  storage: tempfile::TempDir,
  workload: Arc<LocalWorkload>,
  runtime: Arc<FakeRuntime>,
}

impl Fixture {
  fn new(runtime: FakeRuntime) -> Self {
    let scratch = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let workload = Arc::new(LocalWorkload::new(
      "be91345e-bead-4b55-8d3c-3f7fb7b1b1cf",
      storage.path(),
      BuildParams {
        memory: 512,
        ip: "10.0.0.1".to_string(),
        port: 25565,
      },
    ));
    Self {
      scratch,
      storage,
      workload,
      runtime: Arc::new(runtime),
    }
  }

  fn installer(&self, request: InstallationRequest) -> Installer {
    let config = ProvisionerConfig {
      scratch_root: self.scratch.path().to_path_buf(),
      ..ProvisionerConfig::default()
    };
    Installer::new(
      request,
      self.workload.clone(),
      self.runtime.clone(),
      config,
    )
  }

  fn script_path(&self, template_id: i64) -> PathBuf {
    self
      .scratch
      .path()
      .join(self.workload.id())
      .join(format!("install-{template_id}.sh"))
  }

  fn log_path(&self, template_id: i64) -> PathBuf {
    self.storage.path().join(format!("install{template_id}.log"))
  }
}

fn request_with_script(script: Option<&str>) -> InstallationRequest {
  InstallationRequest {
    template: TemplateSpec {
      id: 42,
      script: script.map(str::to_string),
      container: None,
      entrypoint: None,
    },
    variables: vec![
      VariableBinding {
        key: "A".to_string(),
        value: "1".to_string(),
      },
      VariableBinding {
        key: "B".to_string(),
        value: "2".to_string(),
      },
    ],
  }
}

#[tokio::test]
async fn template_without_script_resolves_without_launching_anything() {
  let fixture = Fixture::new(FakeRuntime::default());

  let outcome = fixture
    .installer(request_with_script(None))
    .run()
    .await
    .unwrap();

  assert_eq!(outcome, InstallOutcome::NoScript);
  assert!(!fixture.workload.boot_blocked());
  assert!(fixture.runtime.pulled.lock().unwrap().is_empty());
  assert!(fixture.runtime.runs.lock().unwrap().is_empty());
  assert!(!fixture.log_path(42).exists());
  assert!(!fixture.script_path(42).exists());
}

#[tokio::test]
async fn install_run_end_to_end() {
  let runtime = FakeRuntime {
    handle: Some("ctr-1".to_string()),
    ..FakeRuntime::default()
  };
  let fixture = Fixture::new(runtime);

  let outcome = fixture
    .installer(request_with_script(Some("echo hi\r\necho bye\r\n")))
    .run()
    .await
    .unwrap();

  assert_eq!(outcome, InstallOutcome::Installed);
  assert!(!fixture.workload.boot_blocked());

  // CRLF normalized in the staged script, byte-for-byte otherwise.
  assert_eq!(
    fixture.runtime.script_snapshot.lock().unwrap().as_deref(),
    Some("echo hi\necho bye\n")
  );
  assert_eq!(
    *fixture.runtime.pulled.lock().unwrap(),
    vec!["alpine:3.4".to_string()]
  );

  {
    let runs = fixture.runtime.runs.lock().unwrap();
    assert_eq!(runs.len(), 1);
    let spec = &runs[0];
    assert_eq!(spec.image, "alpine:3.4");
    assert_eq!(
      spec.command,
      vec!["ash".to_string(), "/mnt/install/install-42.sh".to_string()]
    );
    assert_eq!(
      spec.env,
      vec![
        "SERVER_MEMORY=512".to_string(),
        "SERVER_IP=10.0.0.1".to_string(),
        "SERVER_PORT=25565".to_string(),
        "A=1".to_string(),
        "B=2".to_string(),
      ]
    );
    assert!(spec.privileged);
    assert_eq!(spec.mounts.len(), 2);
    assert_eq!(spec.mounts[0].source, fixture.storage.path());
    assert_eq!(spec.mounts[0].destination, Path::new("/mnt/server"));
    assert!(spec.mounts[0].writable);
    assert_eq!(
      spec.mounts[1].source,
      fixture.scratch.path().join(fixture.workload.id())
    );
    assert_eq!(spec.mounts[1].destination, Path::new("/mnt/install"));
    assert!(spec.mounts[1].writable);
  }

  // Scratch script removed, log written and closed, container removed.
  assert!(!fixture.script_path(42).exists());
  assert_eq!(
    tokio::fs::read_to_string(fixture.log_path(42)).await.unwrap(),
    "install output\n"
  );
  assert_eq!(
    *fixture.runtime.removed.lock().unwrap(),
    vec!["ctr-1".to_string()]
  );
}

#[tokio::test]
async fn nonzero_exit_fails_closed_and_skips_cleanup() {
  let runtime = FakeRuntime {
    exit_code: 2,
    ..FakeRuntime::default()
  };
  let fixture = Fixture::new(runtime);

  let err = fixture
    .installer(request_with_script(Some("exit 2\n")))
    .run()
    .await
    .unwrap_err();

  assert!(matches!(err, InstallError::ScriptExit(2)));
  assert!(fixture.workload.boot_blocked());
  // Cleanup nodes depend on `run`, so on failure the scratch script and the
  // log file are left behind.
  assert!(fixture.script_path(42).exists());
  assert!(fixture.log_path(42).exists());
}

#[tokio::test]
async fn pull_failure_prevents_the_container_run() {
  let runtime = FakeRuntime {
    fail_pull: true,
    ..FakeRuntime::default()
  };
  let fixture = Fixture::new(runtime);

  let err = fixture
    .installer(request_with_script(Some("echo hi\n")))
    .run()
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    InstallError::Runtime(RuntimeError::Pull { .. })
  ));
  assert!(fixture.workload.boot_blocked());
  assert!(fixture.runtime.runs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn template_overrides_runner_image_and_entrypoint() {
  let fixture = Fixture::new(FakeRuntime::default());
  let mut request = request_with_script(Some("echo hi\n"));
  request.template.container = Some("debian:12".to_string());
  request.template.entrypoint = Some("bash".to_string());

  fixture.installer(request).run().await.unwrap();

  assert_eq!(
    *fixture.runtime.pulled.lock().unwrap(),
    vec!["debian:12".to_string()]
  );
  let runs = fixture.runtime.runs.lock().unwrap();
  assert_eq!(runs[0].image, "debian:12");
  assert_eq!(runs[0].command[0], "bash");
}
