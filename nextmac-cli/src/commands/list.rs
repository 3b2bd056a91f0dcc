use clap::Args;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ListArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let allocator = global.create_allocator()?;
    let entries = allocator.assignments()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let width = entries
        .iter()
        .map(|e| e.if_name.len())
        .max()
        .unwrap_or(0)
        .max("INTERFACE".len());
    println!("{:<width$}  MAC", "INTERFACE", width = width);
    for entry in entries {
        println!("{:<width$}  {}", entry.if_name, entry.value, width = width);
    }
    Ok(())
}
