use clap::Args;
use nextmac::PoolKind;

#[derive(Args, Debug)]
pub struct AllocateArgs {
    /// Interface name (e.g. wl0.1, eth1_wan)
    pub if_name: String,

    /// Draw from the locally administered pool instead of the global quota
    #[arg(long)]
    pub private: bool,
}

pub fn execute(args: AllocateArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let kind = PoolKind::from_global(!args.private);

    let result = global
        .create_allocator()
        .and_then(|allocator| Ok(allocator.allocate(&args.if_name, kind)?));

    match result {
        Ok(mac) => {
            println!("{}", mac);
            Ok(())
        }
        Err(e) => {
            // Scripts read the failure code from stdout
            let code = e
                .downcast_ref::<nextmac::MacError>()
                .map(nextmac::MacError::code)
                .unwrap_or(1);
            println!("{}", code);
            Err(e)
        }
    }
}
