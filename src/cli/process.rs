use std::{
    env,
    ffi::OsStr,
    path::Path,
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, ProcessRefreshKind, ProcessesToUpdate, Signal, System};
use tracing::info;

const SERVE_COMMAND: &str = "serve";

/// Stops every reminder daemon started from `name`. Other invocations of the same executable,
/// like a `watch` running in another terminal, are left alone.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::everything(),
    );
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't find current process: {e}"))?;

    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }

        // On Linux every thread of the daemon shows up as its own entry.
        if process.thread_kind().is_some()
            || !is_reminder_daemon(process.exe(), process.cmd(), name)
        {
            continue;
        }

        info!("Stopping reminder daemon {pid}");
        // This will forcefully terminate the process on Windows.
        if process.kill_with(Signal::Term).is_none() {
            process.kill();
        }
        process.wait();
        stopped += 1;
    }
    Ok(stopped)
}

fn is_reminder_daemon(exe: Option<&Path>, cmd: &[impl AsRef<OsStr>], name: &Path) -> bool {
    exe.is_some_and(|v| v == name)
        && cmd.iter().any(|v| v.as_ref() == OsStr::new(SERVE_COMMAND))
}

/// Shuts down a previous daemon and starts a new one in a detached process.
pub fn restart_server(app_dir: &Path) -> Result<()> {
    let process_name = env::current_exe()?;
    kill_previous_servers(&process_name)?;
    let mut command = std::process::Command::new(&process_name);
    command.args([
        OsStr::new("--dir"),
        app_dir.as_os_str(),
        OsStr::new(SERVE_COMMAND),
    ]);

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const DETACHED_PROCESS: u32 = 0x00000008;
        command.creation_flags(DETACHED_PROCESS);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    info!("Spawned reminder daemon {}", child.id());
    println!("Started reminder daemon");
    Ok(())
}
