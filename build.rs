// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

fn main() {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
    if cfg!(not(feature = "ffmpeg")) {
        return;
    }

    // Without FFMPEG_DIR, ffmpeg-sys-next falls back to pkg-config
    let Ok(ffmpeg_dir) = std::env::var("FFMPEG_DIR") else { return; };

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "macos" => {
            println!("cargo:rustc-link-search={ffmpeg_dir}/lib");
            println!("cargo:rustc-link-lib=z");
            println!("cargo:rustc-link-lib=bz2");
            println!("cargo:rustc-link-lib=framework=VideoToolbox");
            println!("cargo:rustc-link-lib=framework=CoreMedia");
            println!("cargo:rustc-link-lib=framework=CoreVideo");
            println!("cargo:rustc-link-lib=framework=CoreFoundation");
            println!("cargo:rustc-link-lib=static:+whole-archive,-bundle=x264");
        },
        "linux" => {
            println!("cargo:rustc-link-search={ffmpeg_dir}/lib/amd64");
            println!("cargo:rustc-link-search={ffmpeg_dir}/lib");
        },
        "windows" => {
            println!("cargo:rustc-link-search={ffmpeg_dir}\\lib\\x64");
            println!("cargo:rustc-link-search={ffmpeg_dir}\\lib");
        },
        tos => println!("cargo:warning=no extra ffmpeg link paths for target os {tos:?}")
    }
}
