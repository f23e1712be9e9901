pub(super) struct FileDescriptorProtoLocations;

impl FileDescriptorProtoLocations {
    pub const SERVICE: i32 = 6;
    pub const SYNTAX: i32 = 12;
}

pub(super) struct ServiceDescriptorProtoLocations;

impl ServiceDescriptorProtoLocations {
    pub const METHOD: i32 = 2;
}
