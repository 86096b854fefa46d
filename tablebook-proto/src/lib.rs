pub mod account_service {
    tonic::include_proto!("app.tablebook.account_service");
}

pub mod directory_service {
    tonic::include_proto!("app.tablebook.directory_service");
}

pub mod reservation_service {
    tonic::include_proto!("app.tablebook.reservation_service");
}
