use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-changed=../../config.toml");

    // OUT_DIR is typically target/<profile>/build/backend-xxx/out; the
    // config goes next to the binary in target/<profile>
    let (Ok(out_dir), Ok(profile)) = (env::var("OUT_DIR"), env::var("PROFILE")) else {
        println!("cargo:warning=OUT_DIR or PROFILE not set, config.toml not copied");
        return;
    };
    let Some(target_dir) = Path::new(&out_dir)
        .ancestors()
        .find(|p| p.ends_with(&profile))
    else {
        println!("cargo:warning=target profile directory not found, config.toml not copied");
        return;
    };

    let source_config = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config.toml");
    let dest_config = target_dir.join("config.toml");

    if source_config.exists() {
        match fs::copy(&source_config, &dest_config) {
            Ok(_) => println!("cargo:warning=Copied config.toml to {:?}", dest_config),
            Err(e) => println!("cargo:warning=Failed to copy config.toml: {}", e),
        }
    } else {
        println!(
            "cargo:warning=config.toml not found at {:?}, using default config",
            source_config
        );
    }
}
