use std::env;

fn main() {
    println!("cargo:rustc-check-cfg=cfg(pdfium_bindings)");
    println!("cargo:rerun-if-env-changed=DEP_PDFIUM_BINDINGS");

    // pdfium-sys only exports symbols when it found the headers.
    if env::var_os("DEP_PDFIUM_BINDINGS").is_some() {
        println!("cargo:rustc-cfg=pdfium_bindings");
    }
}
