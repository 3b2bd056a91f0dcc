use clap::Args;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Interface name(s) whose assignment should be forgotten
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,
}

pub fn execute(args: RemoveArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let allocator = global.create_allocator()?;

    let mut failed = 0;
    for target in &args.targets {
        match allocator.remove(target) {
            Ok(0) => tracing::debug!(if_name = %target, "Nothing to remove"),
            Ok(_) => println!("{}", target),
            Err(e) => {
                eprintln!("Error removing '{}': {}", target, e);
                failed += 1;
                if failed == args.targets.len() {
                    return Err(e.into());
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "Failed to remove {} of {} interface(s)",
            failed,
            args.targets.len()
        );
    }
    Ok(())
}
