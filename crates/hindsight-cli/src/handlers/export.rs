use hindsight_runtime::{
    export_session, resolve_workspace_path, BundleMeta, BundleStore, TraceStore,
};

use crate::args::ExportBundleArgs;
use crate::handlers::EXIT_OK;

pub fn handle_export_bundle(args: &ExportBundleArgs) -> anyhow::Result<i32> {
    let data_dir = resolve_workspace_path(args.data_dir.as_deref())?;
    let store = TraceStore::open(&data_dir)?;

    let bytes = export_session(&store, &args.session)?;
    let bundles = BundleStore::new(&args.out);
    let meta = BundleMeta::new("hindsight-cli", "export");
    let receipt = bundles.store(&args.team, &args.session, &bytes, &meta)?;

    if receipt.duplicate {
        println!("Bundle already stored (duplicate=true)");
    } else {
        println!("Stored bundle");
    }
    println!("Key:  {}", receipt.key);
    println!("Sha:  {}", receipt.content_sha256);
    Ok(EXIT_OK)
}
