use std::error::Error;
use std::process::{Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Returns true if the given binary is accessible in PATH.
fn tool_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

const OPERATOR_NAMESPACE: &str = "obsplat-system";
const TEST_NAMESPACE: &str = "obsplat-e2e";
const OPERATOR_NAME: &str = "obsplat-operator";
const PLATFORM_NAME: &str = "e2e-platform";

// ---------------------------------------------------------------------------
// E2E reconciliation test against a real Kind cluster.
// Run with: cargo test --test e2e_kind -- --ignored
// ---------------------------------------------------------------------------

/// End-to-end test exercising the full `ObservabilityPlatform` reconciliation
/// lifecycle:
///
/// 1. Start (or reuse) a Kind cluster.
/// 2. Install the CRDs via `crdgen`.
/// 3. Deploy the operator.
/// 4. Apply a sample `ObservabilityPlatform` manifest.
/// 5. Wait for Prometheus/Grafana workloads and a `Ready` status phase.
/// 6. Scale Grafana's replica count and confirm the Deployment follows.
/// 7. Delete the resource and verify all child resources are cleaned up.
#[test]
#[ignore]
fn e2e_platform_reconciliation() -> Result<(), Box<dyn Error>> {
    for tool in &["kind", "kubectl", "docker"] {
        if !tool_available(tool) {
            eprintln!("Skipping e2e test: `{tool}` not found in PATH.");
            return Ok(());
        }
    }

    let cluster_name = std::env::var("KIND_CLUSTER_NAME").unwrap_or_else(|_| "obsplat-e2e".into());
    ensure_kind_cluster(&cluster_name)?;

    let image = std::env::var("E2E_OPERATOR_IMAGE").unwrap_or_else(|_| "obsplat-operator:e2e".into());
    let build_image = env_true("E2E_BUILD_IMAGE", true);
    let load_image = env_true("E2E_LOAD_IMAGE", true);

    if build_image {
        run_cmd("docker", &["build", "-t", &image, "."])?;
    }
    if load_image {
        run_cmd("kind", &["load", "docker-image", &image, "--name", &cluster_name])?;
    }

    let operator_yaml = operator_manifest(&image);
    let _cleanup = E2eCleanup::new(operator_yaml.clone());

    // ── Install the CRDs ──────────────────────────────────────────────────
    let crd_yaml = run_cmd("cargo", &["run", "--quiet", "--bin", "crdgen"])?;
    kubectl_apply(&crd_yaml)?;

    // ── Deploy the operator ──────────────────────────────────────────────
    run_cmd(
        "kubectl",
        &["create", "namespace", OPERATOR_NAMESPACE, "--dry-run=client", "-o", "yaml"],
    )
    .and_then(|output| kubectl_apply(&output))?;

    kubectl_apply(&operator_yaml)?;
    run_cmd(
        "kubectl",
        &["rollout", "status", "deployment/obsplat-operator", "-n", OPERATOR_NAMESPACE, "--timeout=180s"],
    )?;

    // ── Create test namespace and apply the platform ──────────────────────
    run_cmd(
        "kubectl",
        &["create", "namespace", TEST_NAMESPACE, "--dry-run=client", "-o", "yaml"],
    )
    .and_then(|output| kubectl_apply(&output))?;

    kubectl_apply(&platform_manifest(1))?;

    wait_for("ObservabilityPlatform exists", Duration::from_secs(60), || {
        Ok(run_cmd("kubectl", &["get", "observabilityplatform", PLATFORM_NAME, "-n", TEST_NAMESPACE]).is_ok())
    })?;

    wait_for("Prometheus StatefulSet created", Duration::from_secs(90), || {
        Ok(run_cmd("kubectl", &["get", "statefulset", &format!("{PLATFORM_NAME}-prometheus"), "-n", TEST_NAMESPACE]).is_ok())
    })?;

    wait_for("Grafana Deployment created", Duration::from_secs(90), || {
        Ok(run_cmd("kubectl", &["get", "deployment", &format!("{PLATFORM_NAME}-grafana"), "-n", TEST_NAMESPACE]).is_ok())
    })?;

    wait_for("platform phase == Ready", Duration::from_secs(180), || {
        let phase = run_cmd(
            "kubectl",
            &["get", "observabilityplatform", PLATFORM_NAME, "-n", TEST_NAMESPACE, "-o", "jsonpath={.status.phase}"],
        )
        .unwrap_or_default();
        Ok(phase == "Ready")
    })?;

    // ── Scale Grafana and confirm the Deployment follows ──────────────────
    run_cmd(
        "kubectl",
        &[
            "patch",
            "observabilityplatform",
            PLATFORM_NAME,
            "-n",
            TEST_NAMESPACE,
            "--type",
            "merge",
            "-p",
            r#"{"spec":{"grafana":{"replicas":2}}}"#,
        ],
    )?;

    wait_for("Grafana Deployment scaled", Duration::from_secs(90), || {
        let replicas = run_cmd(
            "kubectl",
            &["get", "deployment", &format!("{PLATFORM_NAME}-grafana"), "-n", TEST_NAMESPACE, "-o", "jsonpath={.spec.replicas}"],
        )?;
        Ok(replicas == "2")
    })?;

    // ── Delete and verify cleanup ───────────────────────────────────────────
    run_cmd(
        "kubectl",
        &["delete", "observabilityplatform", PLATFORM_NAME, "-n", TEST_NAMESPACE, "--timeout=180s", "--wait=true"],
    )?;

    wait_for("Child resources cleaned up", Duration::from_secs(90), || {
        let statefulset = run_cmd("kubectl", &["get", "statefulset", &format!("{PLATFORM_NAME}-prometheus"), "-n", TEST_NAMESPACE]);
        let deployment = run_cmd("kubectl", &["get", "deployment", &format!("{PLATFORM_NAME}-grafana"), "-n", TEST_NAMESPACE]);
        Ok(statefulset.is_err() && deployment.is_err())
    })?;

    Ok(())
}

fn platform_manifest(grafana_replicas: i32) -> String {
    format!(
        r#"apiVersion: obsplat.io/v1beta1
kind: ObservabilityPlatform
metadata:
  name: {name}
  namespace: {namespace}
spec:
  prometheus:
    version: "v2.53.0"
    replicas: 1
    storage:
      size: "2Gi"
  grafana:
    version: "10.4.0"
    replicas: {grafana_replicas}
  loki:
    version: "2.9.0"
    replicas: 1
    storage:
      size: "2Gi"
  tempo:
    version: "2.4.0"
    replicas: 1
    storage:
      size: "2Gi"
"#,
        name = PLATFORM_NAME,
        namespace = TEST_NAMESPACE,
        grafana_replicas = grafana_replicas,
    )
}

struct E2eCleanup {
    operator_manifest: String,
}

impl E2eCleanup {
    fn new(operator_manifest: String) -> Self {
        Self { operator_manifest }
    }
}

impl Drop for E2eCleanup {
    fn drop(&mut self) {
        let _ = run_cmd_quiet(
            "kubectl",
            &["delete", "observabilityplatform", PLATFORM_NAME, "-n", TEST_NAMESPACE, "--ignore-not-found=true", "--timeout=60s", "--wait=true"],
        );
        let _ = run_cmd_with_stdin_quiet("kubectl", &["delete", "-f", "-"], &self.operator_manifest);
        let _ = run_cmd_quiet("kubectl", &["delete", "namespace", TEST_NAMESPACE, "--ignore-not-found=true"]);
        let _ = run_cmd_quiet("kubectl", &["delete", "namespace", OPERATOR_NAMESPACE, "--ignore-not-found=true"]);
    }
}

fn ensure_kind_cluster(name: &str) -> Result<(), Box<dyn Error>> {
    let clusters = run_cmd("kind", &["get", "clusters"])?;
    if clusters.lines().any(|line| line.trim() == name) {
        return Ok(());
    }
    run_cmd("kind", &["create", "cluster", "--name", name])?;
    Ok(())
}

fn kubectl_apply(manifest: &str) -> Result<(), Box<dyn Error>> {
    run_cmd_with_stdin("kubectl", &["apply", "-f", "-"], manifest)?;
    Ok(())
}

fn run_cmd(program: &str, args: &[&str]) -> Result<String, Box<dyn Error>> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Ok(kubeconfig) = std::env::var("KUBECONFIG") {
        cmd.env("KUBECONFIG", kubeconfig);
    }
    let output = cmd.output()?;
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("command failed: {} {:?}\nstdout:\n{}\nstderr:\n{}", program, args, stdout, stderr).into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn run_cmd_with_stdin(program: &str, args: &[&str], input: &str) -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Ok(kubeconfig) = std::env::var("KUBECONFIG") {
        cmd.env("KUBECONFIG", kubeconfig);
    }
    let mut child = cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write;
        stdin.write_all(input.as_bytes())?;
        stdin.flush()?;
        drop(stdin);
    }
    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("command failed: {} {:?}\nstdout:\n{}\nstderr:\n{}", program, args, stdout, stderr).into());
    }
    Ok(())
}

fn run_cmd_quiet(program: &str, args: &[&str]) -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Ok(kubeconfig) = std::env::var("KUBECONFIG") {
        cmd.env("KUBECONFIG", kubeconfig);
    }
    let _ = cmd.output();
    Ok(())
}

fn run_cmd_with_stdin_quiet(program: &str, args: &[&str], input: &str) -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Ok(kubeconfig) = std::env::var("KUBECONFIG") {
        cmd.env("KUBECONFIG", kubeconfig);
    }
    let mut child = match cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(_) => return Ok(()),
    };
    if let Some(mut stdin) = child.stdin.take() {
        use std::io::Write;
        let _ = stdin.write_all(input.as_bytes());
        let _ = stdin.flush();
        drop(stdin);
    }
    let _ = child.wait_with_output();
    Ok(())
}

fn wait_for<F>(label: &str, timeout: Duration, mut condition: F) -> Result<(), Box<dyn Error>>
where
    F: FnMut() -> Result<bool, Box<dyn Error>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        if condition()? {
            return Ok(());
        }
        attempts += 1;
        if start.elapsed() > timeout {
            return Err(format!("timeout while waiting for {} after {:?} (attempts={})", label, timeout, attempts).into());
        }
        sleep(Duration::from_secs(3));
    }
}

fn env_true(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

fn operator_manifest(image: &str) -> String {
    format!(
        r#"---
apiVersion: v1
kind: ServiceAccount
metadata:
  name: {operator_name}
  namespace: {operator_namespace}
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRole
metadata:
  name: {operator_name}
rules:
  - apiGroups: ["obsplat.io"]
    resources: ["observabilityplatforms", "platformbackups", "platformrestores"]
    verbs: ["get", "list", "watch", "create", "update", "patch", "delete"]
  - apiGroups: ["obsplat.io"]
    resources: ["observabilityplatforms/status", "platformbackups/status", "platformrestores/status"]
    verbs: ["get", "update", "patch"]
  - apiGroups: ["obsplat.io"]
    resources: ["observabilityplatforms/finalizers"]
    verbs: ["update"]
  - apiGroups: [""]
    resources: ["pods", "secrets"]
    verbs: ["get", "list", "watch"]
  - apiGroups: [""]
    resources: ["services", "configmaps", "persistentvolumeclaims"]
    verbs: ["get", "list", "watch", "create", "update", "patch", "delete"]
  - apiGroups: ["apps"]
    resources: ["deployments", "statefulsets"]
    verbs: ["get", "list", "watch", "create", "update", "patch", "delete"]
  - apiGroups: ["apps"]
    resources: ["deployments/scale", "statefulsets/scale"]
    verbs: ["get", "update", "patch"]
  - apiGroups: [""]
    resources: ["events"]
    verbs: ["create", "patch"]
  - apiGroups: ["coordination.k8s.io"]
    resources: ["leases"]
    verbs: ["get", "list", "watch", "create", "update", "patch", "delete"]
---
apiVersion: rbac.authorization.k8s.io/v1
kind: ClusterRoleBinding
metadata:
  name: {operator_name}
roleRef:
  apiGroup: rbac.authorization.k8s.io
  kind: ClusterRole
  name: {operator_name}
subjects:
  - kind: ServiceAccount
    name: {operator_name}
    namespace: {operator_namespace}
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: {operator_name}
  namespace: {operator_namespace}
spec:
  replicas: 1
  selector:
    matchLabels:
      app: {operator_name}
  template:
    metadata:
      labels:
        app: {operator_name}
    spec:
      serviceAccountName: {operator_name}
      containers:
        - name: operator
          image: {image}
          imagePullPolicy: IfNotPresent
          env:
            - name: LEADER_ELECTION_NAMESPACE
              value: {operator_namespace}
            - name: WEBHOOK_ENABLED
              value: "false"
"#,
        operator_name = OPERATOR_NAME,
        operator_namespace = OPERATOR_NAMESPACE,
        image = image
    )
}
