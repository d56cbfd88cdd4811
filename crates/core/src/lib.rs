pub mod shared {
    pub mod constants;
    pub mod face_box;
    pub mod frame;
    pub mod kiosk_config;
    pub mod region;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod recognition {
    pub mod domain {
        pub mod feature_extractor;
        pub mod feature_vector;
        pub mod gallery_store;
        pub mod identity_matcher;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod domain {
        pub mod box_smoother;
        pub mod face_tracker;
        pub mod registration;
        pub mod tracked_face;
    }
}

pub mod rendering {
    pub mod domain {
        pub mod overlay_renderer;
    }
    pub mod infrastructure {
        pub mod cpu_overlay_renderer;
    }
}

pub mod video {
    pub mod domain {
        pub mod frame_sink;
        pub mod video_reader;
    }
    pub mod infrastructure {
        pub mod ffmpeg_reader;
        pub mod image_directory_reader;
        pub mod image_sequence_sink;
    }
}

pub mod pipeline {
    pub mod frame_clock;
    pub mod kiosk_engine;
    pub mod kiosk_view;
    pub mod pipeline_logger;
    pub mod run_kiosk_use_case;
    pub mod infrastructure {
        pub mod threaded_frame_source;
    }
}
