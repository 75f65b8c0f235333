diesel::table! {
    storages (id) {
        id -> Uuid,
        storage_service -> Text,
        project -> Text,
    }
}

diesel::table! {
    files (id) {
        id -> Uuid,
        storage_id -> Uuid,
        storage_identifier -> Nullable<Text>,
        filename -> Text,
        directory_path -> Text,
        size -> Int8,
        checksum -> Nullable<Text>,
        modified -> Timestamptz,
        published -> Nullable<Timestamptz>,
        removed -> Nullable<Timestamptz>,
        user_name -> Nullable<Text>,
    }
}

diesel::table! {
    file_set_files (dataset_id, file_id) {
        dataset_id -> Uuid,
        file_id -> Uuid,
    }
}

diesel::table! {
    file_metadata (id) {
        id -> Int8,
        dataset_id -> Uuid,
        file_id -> Uuid,
        title -> Nullable<Text>,
        description -> Nullable<Text>,
        file_type -> Nullable<Text>,
        use_category -> Nullable<Text>,
    }
}

diesel::table! {
    directory_metadata (id) {
        id -> Int8,
        dataset_id -> Uuid,
        storage_id -> Uuid,
        pathname -> Text,
        title -> Nullable<Text>,
        description -> Nullable<Text>,
        use_category -> Nullable<Text>,
    }
}

diesel::joinable!(files -> storages (storage_id));
diesel::joinable!(file_set_files -> files (file_id));
diesel::joinable!(file_metadata -> files (file_id));
diesel::joinable!(directory_metadata -> storages (storage_id));

diesel::allow_tables_to_appear_in_same_query!(
    storages,
    files,
    file_set_files,
    file_metadata,
    directory_metadata,
);
