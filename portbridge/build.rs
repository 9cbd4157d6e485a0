fn main() {
    // Prevent warnings when checking for flag `portbridge_loom`.
    println!("cargo::rustc-check-cfg=cfg(portbridge_loom)");
}
