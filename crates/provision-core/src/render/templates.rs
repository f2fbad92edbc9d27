//! Built-in web server configuration templates.

const APACHE_SERVER: &str = "\
# Generated by provision for server {{ server_name }}. Do not edit.
Listen {{ http_port }}
IncludeOptional {{ server_config_path }}/apache/platform.d/*
IncludeOptional {{ server_config_path }}/apache/vhost.d/*
";

const APACHE_PLATFORM: &str = "\
# Generated by provision for platform {{ platform_name }}. Do not edit.
<Directory {{ document_root }}>
    Options FollowSymLinks
    AllowOverride All
    Require all granted
</Directory>
";

const APACHE_SITE: &str = "\
# Generated by provision for site {{ site_name }}. Do not edit.
<VirtualHost *:{{ http_port }}>
    ServerName {{ uri }}
{{ server_aliases }}    DocumentRoot {{ document_root }}
{{ extra }}</VirtualHost>
";

const NGINX_SERVER: &str = "\
# Generated by provision for server {{ server_name }}. Do not edit.
include {{ server_config_path }}/nginx/platform.d/*;
include {{ server_config_path }}/nginx/vhost.d/*;
";

const NGINX_PLATFORM: &str = "\
# Generated by provision for platform {{ platform_name }}. Do not edit.
# Document root: {{ document_root }}
";

const NGINX_SITE: &str = "\
# Generated by provision for site {{ site_name }}. Do not edit.
server {
    listen {{ http_port }};
    server_name {{ uri }}{{ server_aliases }};
    root {{ document_root }};
    index index.php index.html;
{{ extra }}
    location ~ \\.php$ {
        fastcgi_pass unix:{{ php_sock_location }};
        include fastcgi_params;
        fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;
    }
}
";

pub(super) fn builtin(id: &str) -> Option<&'static str> {
    match id {
        "apache/server" => Some(APACHE_SERVER),
        "apache/platform" => Some(APACHE_PLATFORM),
        "apache/site" => Some(APACHE_SITE),
        "nginx/server" => Some(NGINX_SERVER),
        "nginx/platform" => Some(NGINX_PLATFORM),
        "nginx/site" => Some(NGINX_SITE),
        _ => None,
    }
}
