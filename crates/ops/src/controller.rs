use async_trait::async_trait;
use tracing::{info, warn};

use crate::executor::{CommandLine, ExecutionResult, PrivilegedExecutor};

pub const DEFAULT_PACKAGE_MANAGER: &str = "apt-get";

pub fn default_base_tools() -> Vec<String> {
    ["vim", "curl", "htop"].map(String::from).to_vec()
}

/// Maintenance operations the dispatcher can trigger.
#[async_trait]
pub trait Operations: Send + Sync {
    fn base_tools(&self) -> &[String];
    async fn install_base_tools(&self) -> ExecutionResult;
    async fn uninstall_base_tools(&self) -> ExecutionResult;
    async fn update_system(&self) -> ExecutionResult;
}

pub struct OpsController {
    executor: PrivilegedExecutor,
    package_manager: String,
    tools: Vec<String>,
}

impl OpsController {
    pub fn new(
        executor: PrivilegedExecutor,
        package_manager: impl Into<String>,
        tools: Vec<String>,
    ) -> Self {
        Self {
            executor,
            package_manager: package_manager.into(),
            tools,
        }
    }

    pub fn install_plan(&self) -> Vec<CommandLine> {
        let mut steps = vec![self.step(["update"])];
        if !self.tools.is_empty() {
            steps.push(self.package_step(["install", "-y"]));
        }
        steps
    }

    pub fn uninstall_plan(&self) -> Vec<CommandLine> {
        if self.tools.is_empty() {
            return Vec::new();
        }
        vec![
            self.package_step(["remove", "-y"]),
            self.step(["autoremove", "-y"]),
        ]
    }

    pub fn update_plan(&self) -> Vec<CommandLine> {
        vec![self.step(["update"]), self.step(["upgrade", "-y"])]
    }

    fn step<const N: usize>(&self, args: [&str; N]) -> CommandLine {
        CommandLine::new(self.package_manager.clone(), args)
    }

    fn package_step<const N: usize>(&self, args: [&str; N]) -> CommandLine {
        let args = args
            .iter()
            .map(|arg| arg.to_string())
            .chain(self.tools.iter().cloned());
        CommandLine::new(self.package_manager.clone(), args)
    }

    async fn run_privileged(&self, operation: &str, steps: Vec<CommandLine>) -> ExecutionResult {
        if let Err(error) = self.executor.ensure_privileged() {
            warn!(operation, %error, "privilege check failed");
            return ExecutionResult::failed(Vec::new(), error);
        }
        info!(operation, steps = steps.len(), "starting operation");
        self.executor.run_sequence(&steps).await
    }
}

#[async_trait]
impl Operations for OpsController {
    fn base_tools(&self) -> &[String] {
        &self.tools
    }

    async fn install_base_tools(&self) -> ExecutionResult {
        self.run_privileged("install_base_tools", self.install_plan())
            .await
    }

    async fn uninstall_base_tools(&self) -> ExecutionResult {
        self.run_privileged("uninstall_base_tools", self.uninstall_plan())
            .await
    }

    async fn update_system(&self) -> ExecutionResult {
        self.run_privileged("update_system", self.update_plan()).await
    }
}

#[cfg(test)]
mod tests {
    use shared::error::ExecutionError;

    use super::*;

    fn controller(euid: fn() -> Option<u32>, package_manager: &str) -> OpsController {
        let executor = PrivilegedExecutor::new([package_manager]).with_euid_probe(euid);
        OpsController::new(executor, package_manager, default_base_tools())
    }

    #[test]
    fn install_refreshes_index_before_installing() {
        let ops = controller(|| Some(0), "apt-get");
        let plan: Vec<String> = ops.install_plan().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            plan,
            vec!["apt-get update", "apt-get install -y vim curl htop"]
        );
    }

    #[test]
    fn uninstall_and_update_plans() {
        let ops = controller(|| Some(0), "apt-get");
        let uninstall: Vec<String> = ops.uninstall_plan().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            uninstall,
            vec!["apt-get remove -y vim curl htop", "apt-get autoremove -y"]
        );
        let update: Vec<String> = ops.update_plan().iter().map(|c| c.to_string()).collect();
        assert_eq!(update, vec!["apt-get update", "apt-get upgrade -y"]);
    }

    #[test]
    fn empty_tool_list_skips_package_steps() {
        let executor = PrivilegedExecutor::new(["apt-get"]);
        let ops = OpsController::new(executor, "apt-get", Vec::new());
        assert_eq!(ops.install_plan().len(), 1);
        assert!(ops.uninstall_plan().is_empty());
    }

    #[tokio::test]
    async fn unprivileged_operation_fails_before_spawning() {
        let ops = controller(|| Some(1000), "apt-get");
        let result = ops.install_base_tools().await;
        assert!(matches!(
            result.error,
            Some(ExecutionError::PrivilegeRequired { euid: 1000 })
        ));
        assert!(result.output.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn privileged_operation_runs_every_step() {
        let ops = controller(|| Some(0), "echo");
        let result = ops.install_base_tools().await;
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(
            result.output_text(),
            "update\ninstall -y vim curl htop\n"
        );
    }
}
