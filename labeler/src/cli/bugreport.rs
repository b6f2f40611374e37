use bugreport::{
    bugreport,
    collector::{CompileTimeInformation, EnvironmentVariables, OperatingSystem, SoftwareVersion},
    format::Markdown,
};

pub fn run() {
    bugreport!()
        .info(SoftwareVersion::default())
        .info(OperatingSystem::default())
        .info(EnvironmentVariables::list(&[
            "RUST_LOG",
            "LABELER_PORT",
            "LABELER_UPLOAD_DIR",
            "LABELER_RESULTS_DIR",
            "LABELER_PER_UPLOAD_RESULTS",
            "LABELER_ESC_API_URL",
            "LABELER_CLARIFAI_API_URL",
            "LABELER_PCLOUD_API_URL",
        ]))
        .info(CompileTimeInformation::default())
        .print::<Markdown>();
}
