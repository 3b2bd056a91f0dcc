use clap::Args;

#[derive(Args, Debug)]
pub struct SwapArgs {
    /// First interface
    pub first: String,

    /// Second interface
    pub second: String,
}

pub fn execute(args: SwapArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let allocator = global.create_allocator()?;
    allocator.swap(&args.first, &args.second)?;
    Ok(())
}
