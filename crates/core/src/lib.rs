pub mod capture {
    pub mod capture_manager;
    pub mod domain {
        pub mod camera_provider;
        pub mod capture_error;
        pub mod media_stream;
        pub mod stream_registry;
        pub mod video_sink;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod face_detection;
        pub mod face_inference;
        pub mod inference_dispatch;
        pub mod model_loader;
    }
    pub mod infrastructure;
}

pub mod proctoring {
    pub mod domain {
        pub mod detection_scheduler;
        pub mod proctoring_config;
        pub mod proctoring_event;
        pub mod statistics;
        pub mod violation;
        pub mod violation_aggregator;
        pub mod violation_classifier;
    }
    pub mod error;
    pub mod event_bus;
    pub mod proctoring_service;
    pub mod session_logger;
    pub mod snapshot;
}

pub mod shared {
    pub mod clock;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
}

#[cfg(test)]
mod testing;
