use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Public headers the safety layer calls into.
const HEADERS: &[&str] = &[
    "fpdfview.h",
    "fpdf_text.h",
    "fpdf_edit.h",
    "fpdf_formfill.h",
    "fpdf_progressive.h",
    "fpdf_doc.h",
    "fpdf_structtree.h",
    "fpdf_annot.h",
    "fpdf_thumbnail.h",
    "fpdf_attachment.h",
    "fpdf_signature.h",
    "fpdf_javascript.h",
    "fpdf_transformpage.h",
    "fpdf_save.h",
    "fpdf_flatten.h",
    "fpdf_ppo.h",
    "fpdf_ext.h",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PDFIUM_LIB_DIR");
    println!("cargo:rerun-if-env-changed=PDFIUM_INCLUDE_DIR");
    println!("cargo:rustc-check-cfg=cfg(pdfium_bindings)");

    let out_path = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir).join("bindings.rs"),
        Err(_) => {
            println!("cargo:warning=OUT_DIR not set, skipping PDFium bindings");
            return;
        }
    };

    // Priority 1: explicit headers directory
    let include_dir = env::var("PDFIUM_INCLUDE_DIR").ok().map(PathBuf::from);

    // Priority 2: headers shipped next to the library
    let lib_dir = env::var("PDFIUM_LIB_DIR").ok().map(PathBuf::from);
    let include_dir = include_dir.or_else(|| lib_dir.as_deref().and_then(find_headers));

    let Some(include_dir) = include_dir else {
        println!(
            "cargo:warning=PDFium headers not found; set PDFIUM_LIB_DIR (with include/ or \
             public/) or PDFIUM_INCLUDE_DIR to build the native bindings"
        );
        write_empty_bindings(&out_path);
        return;
    };

    if let Some(lib_dir) = &lib_dir {
        setup_linking(lib_dir);
    } else {
        println!("cargo:warning=PDFIUM_LIB_DIR not set; relying on the system linker path");
        println!("cargo:rustc-link-lib=dylib=pdfium");
    }

    if generate_bindings(&include_dir, &out_path) {
        println!("cargo:rustc-cfg=pdfium_bindings");
        // Seen by dependents as DEP_PDFIUM_BINDINGS.
        println!("cargo:bindings=1");
    } else {
        write_empty_bindings(&out_path);
    }
}

fn find_headers(lib_dir: &Path) -> Option<PathBuf> {
    let candidates = [
        lib_dir.join("include"),
        lib_dir.join("public"),
        lib_dir.join("../include"),
        lib_dir.join("../public"),
    ];
    candidates
        .into_iter()
        .find(|dir| dir.join("fpdfview.h").exists())
}

fn setup_linking(lib_dir: &Path) {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=dylib=pdfium");

    // Add rpath for runtime library discovery (macOS/Linux)
    if cfg!(target_os = "macos") || cfg!(target_os = "linux") {
        println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir.display());
    }
}

fn generate_bindings(include_dir: &Path, out_path: &Path) -> bool {
    println!("cargo:rerun-if-changed={}", include_dir.display());

    let mut builder = bindgen::Builder::default();
    for header in HEADERS {
        let path = include_dir.join(header);
        if path.exists() {
            builder = builder.header(path.to_string_lossy());
        } else {
            println!("cargo:warning=missing PDFium header {}", path.display());
        }
    }

    let bindings = builder
        .clang_arg(format!("-I{}", include_dir.display()))
        .parse_callbacks(Box::new(bindgen::CargoCallbacks::new()))
        .allowlist_function("FPDF.*")
        .allowlist_function("FORM_.*")
        .allowlist_function("FPDFDOC_.*")
        .allowlist_type("FPDF.*")
        .allowlist_type("FS_.*")
        .allowlist_type("IFSDK_PAUSE")
        .allowlist_var("FPDF.*")
        .allowlist_var("FLAT_.*")
        .allowlist_var("FLATTEN_.*")
        .allowlist_var("PDFACTION_.*")
        .allowlist_var("FORMTYPE_.*")
        .allowlist_var("FPDFBitmap_.*")
        .opaque_type("fpdf_.*")
        .generate();

    match bindings {
        Ok(bindings) => match bindings.write_to_file(out_path) {
            Ok(()) => true,
            Err(err) => {
                println!("cargo:warning=couldn't write PDFium bindings: {}", err);
                false
            }
        },
        Err(err) => {
            println!("cargo:warning=unable to generate PDFium bindings: {}", err);
            false
        }
    }
}

fn write_empty_bindings(out_path: &Path) {
    if let Err(err) = fs::write(out_path, "// PDFium headers unavailable at build time.\n") {
        println!("cargo:warning=couldn't write placeholder bindings: {}", err);
    }
}
