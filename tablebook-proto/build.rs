fn main() {
    tonic_build::configure()
        .compile_protos(
            &[
                "proto/accounts.proto",
                "proto/directory.proto",
                "proto/reservations.proto",
            ],
            &["proto"],
        )
        .unwrap_or_else(|e| panic!("Failed to compile protos {:?}", e));
}
