use std::io::Read;
use tracing::trace;
use xml::reader::XmlEvent;

use crate::types::*;

type XmlEvents<R> = xml::reader::Events<R>;
type XmlAttribute = xml::attribute::OwnedAttribute;

//--------------------------------------------------------------------------------------------------
struct ParseCtx<R: Read> {
    events: XmlEvents<R>,
    xpath: String,
    errors: Vec<Error>,
    fatal: Option<xml::reader::Error>,
}

impl<R: Read> ParseCtx<R> {
    fn next_event(&mut self) -> Option<XmlEvent> {
        match self.events.next() {
            Some(Ok(e)) => Some(e),
            Some(Err(e)) => {
                if self.fatal.is_none() {
                    self.fatal = Some(e);
                }
                None
            }
            None => None,
        }
    }

    fn push_element(&mut self, name: &str) {
        self.xpath.push('/');
        self.xpath.push_str(name);
    }

    fn pop_element(&mut self) {
        if let Some(separator_pos) = self.xpath.rfind('/') {
            self.xpath.truncate(separator_pos);
        } else {
            self.errors.push(Error::Internal {
                desc: "ParseCtx push_element/pop_element mismatch.",
            });
        }
    }
}

//--------------------------------------------------------------------------------------------------
macro_rules! unwrap_attribute (
    ($ctx:expr, $element:ident, $attribute:ident) => {
        let $attribute = match $attribute {
            Some(val) => val,
            None => {
                $ctx.errors.push(Error::MissingAttribute {
                    xpath: $ctx.xpath.clone(),
                    name: String::from(stringify!($attribute)),
                });
                return None;
            }
        };
    };
);

macro_rules! match_attributes {
    ($ctx:expr, $a:ident in $attributes:expr, $($p:pat => $e:expr),+) => {
        for $a in $attributes {
            let n = $a.name.local_name.as_str();
            match n {
                $(
                    $p => $e,
                )+
                _ => trace!(xpath = %$ctx.xpath, attribute = n, "skipping attribute"),
            }
        }
    };
}

macro_rules! match_elements {
    ($ctx:expr, $($p:pat => $e:expr),+) => {
        while let Some(e) = $ctx.next_event() {
            match e {
                XmlEvent::StartElement { name, .. } => {
                    let name = name.local_name.as_str();
                    $ctx.push_element(name);
                    match name {
                        $(
                            $p => $e,
                        )+
                        _ => {
                            trace!(xpath = %$ctx.xpath, "skipping element");
                            consume_current_element($ctx);
                        }
                    }
                }
                XmlEvent::EndElement { .. } => {
                    $ctx.pop_element();
                    break;
                }
                _ => {}
            }
        }
    };

    ( $ctx:expr, $attributes:ident, $($p:pat => $e:expr),+) => {
        while let Some(e) = $ctx.next_event() {
            match e {
                XmlEvent::StartElement { name, $attributes, .. } => {
                    let name = name.local_name.as_str();
                    $ctx.push_element(name);
                    match name {
                        $(
                            $p => $e,
                        )+
                        _ => {
                            trace!(xpath = %$ctx.xpath, "skipping element");
                            consume_current_element($ctx);
                        }
                    }
                }
                XmlEvent::EndElement { .. } => {
                    $ctx.pop_element();
                    break;
                }
                _ => {}
            }
        }
    };
}

//--------------------------------------------------------------------------------------------------
/// Parses a Vulkan registry file.
pub fn parse_file(path: &std::path::Path) -> Result<Registry, FatalError> {
    let file = std::io::BufReader::new(std::fs::File::open(path)?);
    let parser = xml::reader::ParserConfig::new().create_reader(file);
    parse_xml(parser.into_iter())
}

/// Parses a Vulkan registry document from a stream.
pub fn parse_stream<T: std::io::Read>(stream: T) -> Result<Registry, FatalError> {
    let parser = xml::reader::ParserConfig::new().create_reader(stream);
    parse_xml(parser.into_iter())
}

fn parse_xml<R: Read>(events: XmlEvents<R>) -> Result<Registry, FatalError> {
    let mut ctx = ParseCtx {
        events,
        xpath: String::from(""),
        errors: Vec::new(),
        fatal: None,
    };

    let mut result = None;

    {
        let ctx = &mut ctx;
        match_elements! {ctx,
            "registry" => result = Some(parse_registry(ctx))
        }
    }

    if let Some(e) = ctx.fatal {
        return Err(FatalError::XmlError(e));
    }
    if let Some(e) = FatalError::malformed(ctx.errors) {
        return Err(e);
    }
    result.ok_or(FatalError::MissingRegistryElement)
}

fn parse_registry<R: Read>(ctx: &mut ParseCtx<R>) -> Registry {
    let mut registry = Registry(Vec::new());

    match_elements! {ctx, attributes,
        "platforms" => {
            let mut children = Vec::new();
            match_elements!{ctx, attributes,
                "platform" => if let Some(v) = parse_platform(ctx, attributes) {
                    children.push(v);
                }
            }
            registry.0.push(RegistryChild::Platforms(children));
        },
        "types" => {
            let mut children = Vec::new();
            match_elements!{ctx, attributes,
                "type" => if let Some(v) = parse_type(ctx, attributes) {
                    children.push(v);
                }
            }
            registry.0.push(RegistryChild::Types(children));
        },
        "commands" => {
            let mut children = Vec::new();
            match_elements!{ctx, attributes,
                "command" => if let Some(v) = parse_command(ctx, attributes) {
                    children.push(v);
                }
            }
            registry.0.push(RegistryChild::Commands(children));
        },
        "feature" => if let Some(v) = parse_feature(ctx, attributes) {
            registry.0.push(RegistryChild::Feature(v));
        },
        "extensions" => {
            let mut children = Vec::new();
            match_elements!{ctx, attributes,
                "extension" => if let Some(v) = parse_extension(ctx, attributes) {
                    children.push(v);
                }
            }
            registry.0.push(RegistryChild::Extensions(children));
        }
    }

    registry
}

fn parse_platform<R: Read>(
    ctx: &mut ParseCtx<R>,
    attributes: Vec<XmlAttribute>,
) -> Option<Platform> {
    let mut name = None;
    let mut protect = None;

    match_attributes! {ctx, a in attributes,
        "name"    => name    = Some(a.value),
        "protect" => protect = Some(a.value)
    }

    consume_current_element(ctx);

    unwrap_attribute!(ctx, platform, name);
    unwrap_attribute!(ctx, platform, protect);

    Some(Platform { name, protect })
}

fn parse_type<R: Read>(ctx: &mut ParseCtx<R>, attributes: Vec<XmlAttribute>) -> Option<Type> {
    let mut api = None;
    let mut name = None;
    let mut category = None;
    let mut supported = None;
    let mut members = Vec::new();

    match_attributes! {ctx, a in attributes,
        "api"       => api       = Some(a.value),
        "name"      => name      = Some(a.value),
        "category"  => category  = Some(a.value),
        "supported" => supported = Some(a.value)
    }

    match_elements! {ctx, attributes,
        "member" => if let Some(v) = parse_type_member(ctx, attributes) {
            members.push(v);
        },
        "name" => {
            let text = parse_text_element(ctx);
            if name.is_none() {
                name = Some(text);
            }
        }
    }

    let name = if let Some(v) = name {
        v
    } else {
        ctx.errors.push(Error::MissingElement {
            xpath: ctx.xpath.clone(),
            name: String::from("name"),
        });
        return None;
    };

    Some(Type {
        name,
        category,
        api,
        supported,
        members,
    })
}

fn parse_type_member<R: Read>(
    ctx: &mut ParseCtx<R>,
    attributes: Vec<XmlAttribute>,
) -> Option<TypeMember> {
    let mut api = None;

    match_attributes! {ctx, a in attributes,
        "api" => api = Some(a.value)
    }

    let parts = parse_declaration(ctx);

    Some(TypeMember {
        api,
        type_name: element_text(&parts, "type"),
        name: element_text(&parts, "name"),
        code: render_declaration(&parts),
        trailing: text_after_name(&parts),
    })
}

fn parse_command<R: Read>(ctx: &mut ParseCtx<R>, attributes: Vec<XmlAttribute>) -> Option<Command> {
    let mut name = None;
    let mut alias = None;
    let mut api = None;

    match_attributes! {ctx, a in attributes,
        "name"  => name  = Some(a.value),
        "alias" => alias = Some(a.value),
        "api"   => api   = Some(a.value)
    }

    if let Some(alias) = alias {
        consume_current_element(ctx);
        unwrap_attribute!(ctx, command, name);
        return Some(Command::Alias { name, alias });
    }

    let mut proto = None;
    let mut params = Vec::new();

    match_elements! {ctx, attributes,
        "proto" => {
            let parts = parse_declaration(ctx);
            proto = name_with_type(ctx, &parts);
        },
        "param" => {
            let mut api = None;
            match_attributes!{ctx, a in attributes,
                "api" => api = Some(a.value)
            }
            let parts = parse_declaration(ctx);
            if let Some(definition) = name_with_type(ctx, &parts) {
                let suffix = text_after_name(&parts);
                params.push(CommandParam {
                    api,
                    definition,
                    code: render_declaration(&parts),
                    is_array: suffix
                        .find('[')
                        .map_or(false, |open| suffix[open..].contains(']')),
                });
            }
        }
    }

    let proto = if let Some(v) = proto {
        v
    } else {
        ctx.errors.push(Error::MissingElement {
            xpath: ctx.xpath.clone(),
            name: String::from("proto"),
        });
        return None;
    };

    Some(Command::Definition(CommandDefinition { api, proto, params }))
}

fn parse_feature<R: Read>(ctx: &mut ParseCtx<R>, attributes: Vec<XmlAttribute>) -> Option<Feature> {
    let mut api = None;
    let mut name = None;
    let mut children = Vec::new();

    match_attributes! {ctx, a in attributes,
        "api"  => api  = Some(a.value),
        "name" => name = Some(a.value)
    }

    match_elements! {ctx, attributes,
        "require" => children.push(parse_require(ctx, attributes))
    }

    unwrap_attribute!(ctx, feature, name);

    Some(Feature {
        api,
        name,
        children,
    })
}

fn parse_extension<R: Read>(
    ctx: &mut ParseCtx<R>,
    attributes: Vec<XmlAttribute>,
) -> Option<Extension> {
    let mut name = None;
    let mut supported = None;
    let mut depends = None;
    let mut platform = None;
    let mut children = Vec::new();

    match_attributes! {ctx, a in attributes,
        "name"      => name      = Some(a.value),
        "supported" => supported = Some(a.value),
        "depends"   => depends   = Some(a.value),
        "platform"  => platform  = Some(a.value)
    }

    match_elements! {ctx, attributes,
        "require" => children.push(parse_require(ctx, attributes))
    }

    unwrap_attribute!(ctx, extension, name);

    Some(Extension {
        name,
        supported,
        depends,
        platform,
        children,
    })
}

fn parse_require<R: Read>(ctx: &mut ParseCtx<R>, attributes: Vec<XmlAttribute>) -> Require {
    let mut depends = None;
    let mut items = Vec::new();

    match_attributes! {ctx, a in attributes,
        "depends" => depends = Some(a.value)
    }

    match_elements! {ctx, attributes,
        "type" => if let Some(name) = parse_interface_name(ctx, attributes) {
            items.push(InterfaceItem::Type { name });
        },
        "command" => if let Some(name) = parse_interface_name(ctx, attributes) {
            items.push(InterfaceItem::Command { name });
        }
    }

    Require { depends, items }
}

fn parse_interface_name<R: Read>(
    ctx: &mut ParseCtx<R>,
    attributes: Vec<XmlAttribute>,
) -> Option<String> {
    let mut name = None;
    match_attributes! {ctx, a in attributes,
        "name" => name = Some(a.value)
    }
    consume_current_element(ctx);
    unwrap_attribute!(ctx, item, name);
    Some(name)
}

//--------------------------------------------------------------------------------------------------
/// Piece of a mixed-content declaration such as `<param>` or `<member>`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeclarationPart {
    Text(String),
    Element { tag: String, text: String },
}

/// Collects the text and child elements of the current element. `<comment>`
/// children are dropped.
fn parse_declaration<R: Read>(ctx: &mut ParseCtx<R>) -> Vec<DeclarationPart> {
    let mut parts = Vec::new();
    while let Some(e) = ctx.next_event() {
        match e {
            XmlEvent::Characters(text) | XmlEvent::Whitespace(text) => {
                if let Some(DeclarationPart::Text(last)) = parts.last_mut() {
                    last.push_str(&text);
                } else {
                    parts.push(DeclarationPart::Text(text));
                }
            }
            XmlEvent::StartElement { name, .. } => {
                let tag = name.local_name;
                ctx.push_element(&tag);
                let text = parse_text_element(ctx);
                if tag != "comment" {
                    parts.push(DeclarationPart::Element { tag, text });
                }
            }
            XmlEvent::EndElement { .. } => {
                ctx.pop_element();
                break;
            }
            _ => (),
        }
    }
    parts
}

/// Joins all pieces with single spaces.
fn render_declaration(parts: &[DeclarationPart]) -> String {
    let mut code = String::new();
    for part in parts {
        let text = match part {
            DeclarationPart::Text(text) | DeclarationPart::Element { text, .. } => text,
        };
        for token in text.split_whitespace() {
            if !code.is_empty() {
                code.push(' ');
            }
            code.push_str(token);
        }
    }
    code
}

/// Raw text following the `<name>` child, element text included, e.g.
/// `[VK_UUID_SIZE]` for `<name>uuid</name>[<enum>VK_UUID_SIZE</enum>]`.
fn text_after_name(parts: &[DeclarationPart]) -> String {
    let mut trailing = String::new();
    let mut after_name = false;
    for part in parts {
        match part {
            DeclarationPart::Element { tag, .. } if tag == "name" && !after_name => {
                after_name = true
            }
            DeclarationPart::Text(text) | DeclarationPart::Element { text, .. } if after_name => {
                trailing.push_str(text)
            }
            _ => (),
        }
    }
    trailing
}

fn element_text(parts: &[DeclarationPart], wanted: &str) -> Option<String> {
    parts.iter().find_map(|part| match part {
        DeclarationPart::Element { tag, text } if tag == wanted => Some(text.clone()),
        _ => None,
    })
}

fn name_with_type<R: Read>(
    ctx: &mut ParseCtx<R>,
    parts: &[DeclarationPart],
) -> Option<NameWithType> {
    let name = if let Some(v) = element_text(parts, "name") {
        v
    } else {
        ctx.errors.push(Error::MissingElement {
            xpath: ctx.xpath.clone(),
            name: String::from("name"),
        });
        return None;
    };

    Some(NameWithType {
        type_name: element_text(parts, "type"),
        name,
    })
}

fn consume_current_element<R: Read>(ctx: &mut ParseCtx<R>) {
    let mut depth = 1;
    while let Some(e) = ctx.next_event() {
        match e {
            XmlEvent::StartElement { name, .. } => {
                ctx.push_element(name.local_name.as_str());
                depth += 1;
            }
            XmlEvent::EndElement { .. } => {
                depth -= 1;
                ctx.pop_element();
                if depth == 0 {
                    break;
                }
            }
            _ => (),
        }
    }
}

fn parse_text_element<R: Read>(ctx: &mut ParseCtx<R>) -> String {
    let mut result = String::new();
    let mut depth = 1;
    while let Some(e) = ctx.next_event() {
        match e {
            XmlEvent::StartElement { name, .. } => {
                ctx.push_element(name.local_name.as_str());
                depth += 1;
            }
            XmlEvent::Characters(text) => result.push_str(&text),
            XmlEvent::EndElement { .. } => {
                depth -= 1;
                ctx.pop_element();
                if depth == 0 {
                    break;
                }
            }
            _ => (),
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(text: &str) -> Result<Registry, FatalError> {
        parse_stream(text.as_bytes())
    }

    fn single_command(text: &str) -> CommandDefinition {
        let registry = parse(&format!("<registry><commands>{}</commands></registry>", text)).unwrap();
        let definition = match registry.commands().next() {
            Some(Command::Definition(definition)) => definition.clone(),
            other => panic!("unexpected command {:?}", other),
        };
        definition
    }

    #[test]
    fn test_param_rendering() {
        let command = single_command(
            "<command><proto><type>VkResult</type> <name>vkCreateInstance</name></proto>\
             <param>const <type>VkInstanceCreateInfo</type>*   <name>pCreateInfo</name></param>\
             <param><type>VkInstance</type>* <name>pInstance</name></param></command>",
        );
        assert_eq!(command.proto.name, "vkCreateInstance");
        assert_eq!(command.proto.type_name.as_deref(), Some("VkResult"));
        assert_eq!(command.params[0].code, "const VkInstanceCreateInfo * pCreateInfo");
        assert_eq!(
            command.params[0].definition.type_name.as_deref(),
            Some("VkInstanceCreateInfo")
        );
        assert!(!command.params[0].is_array);
        assert_eq!(command.params[1].code, "VkInstance * pInstance");
    }

    #[test]
    fn test_array_param() {
        let command = single_command(
            "<command><proto><type>void</type> <name>vkCmdSetBlendConstants</name></proto>\
             <param><type>VkCommandBuffer</type> <name>commandBuffer</name></param>\
             <param>const <type>float</type> <name>blendConstants</name>[4]</param></command>",
        );
        assert_eq!(command.params[1].code, "const float blendConstants [4]");
        assert!(command.params[1].is_array);
        assert!(!command.params[0].is_array);
    }

    #[test]
    fn test_enum_length_array_param() {
        let command = single_command(
            "<command><proto><type>void</type> <name>vkCmdSetValues</name></proto>\
             <param><type>VkCommandBuffer</type> <name>commandBuffer</name></param>\
             <param>const <type>float</type> <name>values</name>[<enum>VK_N</enum>]</param></command>",
        );
        assert_eq!(command.params[1].code, "const float values [ VK_N ]");
        assert_eq!(command.params[1].definition.name, "values");
        assert!(command.params[1].is_array);
        assert!(!command.params[0].is_array);
    }

    #[test]
    fn test_member_parts() {
        let registry = parse(
            "<registry><types><type category=\"struct\" name=\"VkPhysicalDeviceProperties\">\
             <member><type>char</type> <name>deviceName</name>[<enum>VK_MAX_PHYSICAL_DEVICE_NAME_SIZE</enum>]<comment>name</comment></member>\
             <member api=\"vulkansc\"><type>uint32_t</type> <name>other</name></member>\
             </type></types></registry>",
        )
        .unwrap();
        let ty = registry.types().next().unwrap();
        assert_eq!(ty.name, "VkPhysicalDeviceProperties");
        assert_eq!(ty.category.as_deref(), Some("struct"));
        assert_eq!(ty.members.len(), 2);
        assert_eq!(
            ty.members[0].trailing,
            "[VK_MAX_PHYSICAL_DEVICE_NAME_SIZE]"
        );
        assert_eq!(
            ty.members[0].code,
            "char deviceName [ VK_MAX_PHYSICAL_DEVICE_NAME_SIZE ]"
        );
        assert_eq!(ty.members[1].api.as_deref(), Some("vulkansc"));
    }

    #[test]
    fn test_type_name_from_child() {
        let registry = parse(
            "<registry><types><type category=\"handle\">\
             <type>VK_DEFINE_HANDLE</type>(<name>VkInstance</name>)</type></types></registry>",
        )
        .unwrap();
        let ty = registry.types().next().unwrap();
        assert_eq!(ty.name, "VkInstance");
        assert_eq!(ty.category.as_deref(), Some("handle"));
    }

    #[test]
    fn test_unknown_elements_are_skipped() {
        let registry = parse(
            "<registry><comment>text</comment><tags><tag name=\"KHR\"/></tags>\
             <feature api=\"vulkan\" name=\"VK_VERSION_1_0\" number=\"1.0\">\
             <require comment=\"x\"><enum name=\"A\"/><command name=\"vkA\"/></require>\
             <remove><command name=\"vkB\"/></remove></feature></registry>",
        )
        .unwrap();
        assert_eq!(registry.0.len(), 1);
        let feature = registry.features().next().unwrap();
        assert_eq!(feature.children.len(), 1);
        assert_eq!(
            feature.children[0].items,
            vec![InterfaceItem::Command {
                name: String::from("vkA")
            }]
        );
    }

    #[test]
    fn test_missing_registry() {
        assert!(matches!(
            parse("<other/>"),
            Err(FatalError::MissingRegistryElement)
        ));
    }

    #[test]
    fn test_malformed_xml() {
        assert!(matches!(
            parse("<registry><types></registry>"),
            Err(FatalError::XmlError(_))
        ));
    }

    #[test]
    fn test_alias_without_name() {
        let text = "<registry><commands><command alias=\"vkA\"><comment>x</comment></command>\
                    </commands><platforms><platform name=\"xlib\"/></platforms></registry>";
        match parse(text) {
            Err(FatalError::Malformed { first, rest }) => {
                assert_eq!(
                    first,
                    Error::MissingAttribute {
                        xpath: String::from("/registry/commands"),
                        name: String::from("name"),
                    }
                );
                assert_eq!(
                    rest,
                    vec![Error::MissingAttribute {
                        xpath: String::from("/registry/platforms"),
                        name: String::from("protect"),
                    }]
                );
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_attribute() {
        match parse("<registry><platforms><platform name=\"xlib\"/></platforms></registry>") {
            Err(FatalError::Malformed { first, rest }) => {
                assert_eq!(
                    first,
                    Error::MissingAttribute {
                        xpath: String::from("/registry/platforms"),
                        name: String::from("protect"),
                    }
                );
                assert!(rest.is_empty());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
