use super::*;

use log::debug;
use prost_types::{MethodDescriptorProto, ServiceDescriptorProto};

use crate::ast::{Method, Service};
use crate::ident::to_go_camel;

impl CodeGenerator<'_, '_> {
    pub(super) fn push_services(&mut self, buf: &mut GeneratedFile) -> Result<(), Error> {
        let file = self.file;
        self.context.service_generator_mut().file_prelude(buf);

        self.path.push(FileDescriptorProtoLocations::SERVICE);
        for (idx, service) in file.service.iter().enumerate() {
            self.path.push(idx as i32);
            let service = self.resolve_service(service)?;
            self.context.service_generator_mut().generate(service, buf);
            self.path.pop();
        }
        self.path.pop();

        Ok(())
    }

    fn resolve_service(&mut self, service: &ServiceDescriptorProto) -> Result<Service, Error> {
        let name = service.name().to_owned();
        debug!("  service: {:?}", name);

        let full_name = self.fq_name(&name).proto_name().to_owned();
        let comments = self.comments_from_location().unwrap_or_default();

        self.path.push(ServiceDescriptorProtoLocations::METHOD);
        let methods = service
            .method
            .iter()
            .enumerate()
            .map(|(idx, method)| {
                self.path.push(idx as i32);
                let method = self.resolve_method(&full_name, method);
                self.path.pop();
                method
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.path.pop();

        Ok(Service {
            name: to_go_camel(&name),
            proto_name: name,
            full_name,
            source_file: self.file.name().to_owned(),
            comments,
            deprecated: service
                .options
                .as_ref()
                .map_or(false, |options| options.deprecated()),
            methods,
        })
    }

    fn resolve_method(
        &self,
        service_full_name: &str,
        method: &MethodDescriptorProto,
    ) -> Result<Method, Error> {
        debug!("  method: {:?}", method.name());

        let referenced_by = format!("{}.{}", service_full_name, method.name());
        let input_proto_type = method.input_type().to_owned();
        let output_proto_type = method.output_type().to_owned();
        let input_type = self.context.resolve_ident(
            &FullyQualifiedName::from_type_name(&input_proto_type),
            &referenced_by,
        )?;
        let output_type = self.context.resolve_ident(
            &FullyQualifiedName::from_type_name(&output_proto_type),
            &referenced_by,
        )?;

        Ok(Method {
            name: to_go_camel(method.name()),
            proto_name: method.name().to_owned(),
            comments: self.comments_from_location().unwrap_or_default(),
            input_type,
            output_type,
            input_proto_type,
            output_proto_type,
            client_streaming: method.client_streaming(),
            server_streaming: method.server_streaming(),
            deprecated: method
                .options
                .as_ref()
                .map_or(false, |options| options.deprecated()),
        })
    }
}
