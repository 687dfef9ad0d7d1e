// Build script for nixaictl - embeds version at compile time

fn main() {
    // Release builds may override the crate version
    let version =
        std::env::var("NIXAI_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=NIXAI_VERSION={}", version);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=NIXAI_VERSION");
}
