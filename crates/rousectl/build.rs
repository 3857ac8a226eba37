// Build script for rousectl - embeds version at compile time

fn main() {
    // Release pipelines may stamp their own version; otherwise use Cargo.toml
    let version =
        std::env::var("ROUSE_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=ROUSE_VERSION={}", version);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=ROUSE_VERSION");
}
