pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Directory name used under the platform config/cache/data dirs.
pub const APP_DIR_NAME: &str = "FaceGate";

pub const DATABASE_FILE_NAME: &str = "players_database.db";
pub const CONFIG_FILE_NAME: &str = "config.json";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Frame rate assumed for image-directory replay when none is given.
pub const DEFAULT_REPLAY_FPS: f64 = 10.0;
