fn main() -> Result<(), Box<dyn std::error::Error>> {
    let protos = ["proto/execution/v1/execution.proto"];

    // Use the bundled protoc unless the environment provides one.
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&protos, &["proto"])?;

    for proto in &protos {
        println!("cargo:rerun-if-changed={}", proto);
    }

    Ok(())
}
