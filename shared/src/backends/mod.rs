cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        compile_error!("voxnet-shared has no wasm backend yet, build for a native target");
    } else {
        mod native;
        pub use native::*;
    }
}
