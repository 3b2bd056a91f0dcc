use clap::Args;
use nextmac::MacAddress;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ReservedArgs {
    /// Print JSON instead of one address per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ReservedReport {
    variant: String,
    reserved: Vec<MacAddress>,
}

pub fn execute(args: ReservedArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let allocator = global.create_allocator()?;
    let reserved = allocator.reserved_quota()?;

    if args.json {
        let report = ReservedReport {
            variant: allocator.variant().to_string(),
            reserved,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for mac in reserved {
            println!("{}", mac);
        }
    }
    Ok(())
}
