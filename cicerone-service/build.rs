fn main() {
    // PDFium is bound at runtime, nothing to link here. Lookup order:
    // 1. Current directory
    // 2. vendor/pdfium/lib/
    // 3. System library paths
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=prompts");
    println!("cargo:rerun-if-changed=static");
    println!("cargo:rerun-if-changed=locales");
}
