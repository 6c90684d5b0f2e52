//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use once_cell::sync::Lazy;
use rat_embed_lang::register_translations;
use std::collections::HashMap;

static TRANSLATIONS_REGISTERED: Lazy<()> = Lazy::new(ErrorMessageI18n::register_all_translations);

/// 确保翻译已注册（不修改当前语言）
pub fn ensure_registered() {
    Lazy::force(&TRANSLATIONS_REGISTERED);
}

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();

        // 找不到适配器
        let mut no_adapter = HashMap::new();
        no_adapter.insert("zh-CN".to_string(), "没有适配器支持模型 '{model}'".to_string());
        no_adapter.insert("en-US".to_string(), "No adapter supports model '{model}'".to_string());
        no_adapter.insert("ja-JP".to_string(), "モデル '{model}' をサポートするアダプターがありません".to_string());
        translations.insert("error.no_adapter".to_string(), no_adapter);

        // 适配器不支持该模型
        let mut adapter_mismatch = HashMap::new();
        adapter_mismatch.insert("zh-CN".to_string(), "适配器 '{adapter}' 不支持模型 '{model}'".to_string());
        adapter_mismatch.insert("en-US".to_string(), "Adapter '{adapter}' does not support model '{model}'".to_string());
        adapter_mismatch.insert("ja-JP".to_string(), "アダプター '{adapter}' はモデル '{model}' をサポートしていません".to_string());
        translations.insert("error.adapter_mismatch".to_string(), adapter_mismatch);

        // 仅支持异步提取
        let mut async_only = HashMap::new();
        async_only.insert("zh-CN".to_string(), "适配器 '{adapter}' 只支持异步提取，请改用 from_model_async".to_string());
        async_only.insert("en-US".to_string(), "Adapter '{adapter}' only supports async extraction, use from_model_async instead".to_string());
        async_only.insert("ja-JP".to_string(), "アダプター '{adapter}' は非同期抽出のみサポートします。from_model_async を使用してください".to_string());
        translations.insert("error.async_only_extraction".to_string(), async_only);

        // 列类型没有提供者
        let mut unknown_column_type = HashMap::new();
        unknown_column_type.insert("zh-CN".to_string(), "列 '{column}' 的类型 '{column_type}' 没有已注册的字段类型提供者".to_string());
        unknown_column_type.insert("en-US".to_string(), "Column '{column}' has type '{column_type}' with no registered field type provider".to_string());
        unknown_column_type.insert("ja-JP".to_string(), "カラム '{column}' の型 '{column_type}' に登録済みのフィールド型プロバイダーがありません".to_string());
        translations.insert("error.unknown_column_type".to_string(), unknown_column_type);

        // 前向引用无法解析
        let mut unresolved_ref = HashMap::new();
        unresolved_ref.insert("zh-CN".to_string(), "字段 '{field}' 的前向引用 '{target}' 无法解析".to_string());
        unresolved_ref.insert("en-US".to_string(), "Forward reference '{target}' of field '{field}' cannot be resolved".to_string());
        unresolved_ref.insert("ja-JP".to_string(), "フィールド '{field}' の前方参照 '{target}' を解決できません".to_string());
        translations.insert("error.unresolved_forward_ref".to_string(), unresolved_ref);

        // 多层嵌套的前向引用
        let mut nested_ref = HashMap::new();
        nested_ref.insert("zh-CN".to_string(), "字段 '{field}' 的前向引用嵌套超过一层容器，无法推导类型".to_string());
        nested_ref.insert("en-US".to_string(), "Forward reference of field '{field}' is nested in more than one container".to_string());
        nested_ref.insert("ja-JP".to_string(), "フィールド '{field}' の前方参照が複数のコンテナにネストされています".to_string());
        translations.insert("error.nested_forward_ref".to_string(), nested_ref);

        // 循环引用
        let mut cyclic_ref = HashMap::new();
        cyclic_ref.insert("zh-CN".to_string(), "检测到模型循环引用: {path}".to_string());
        cyclic_ref.insert("en-US".to_string(), "Cyclic model reference detected: {path}".to_string());
        cyclic_ref.insert("ja-JP".to_string(), "モデルの循環参照を検出しました: {path}".to_string());
        translations.insert("error.cyclic_reference".to_string(), cyclic_ref);

        // 构造模型时缺少必填字段
        let mut missing_required = HashMap::new();
        missing_required.insert("zh-CN".to_string(), "构造模型 '{model}' 时缺少必填字段 '{field}'".to_string());
        missing_required.insert("en-US".to_string(), "Required field '{field}' is missing when constructing model '{model}'".to_string());
        missing_required.insert("ja-JP".to_string(), "モデル '{model}' の構築時に必須フィールド '{field}' がありません".to_string());
        translations.insert("error.missing_required_field".to_string(), missing_required);

        // 字段映射引用了不存在的字段
        let mut mapping_not_found = HashMap::new();
        mapping_not_found.insert("zh-CN".to_string(), "字段映射引用的字段 '{field}' 在源模型中不存在".to_string());
        mapping_not_found.insert("en-US".to_string(), "Field '{field}' referenced in field_mapping does not exist on the source model".to_string());
        mapping_not_found.insert("ja-JP".to_string(), "field_mapping で参照されたフィールド '{field}' がソースモデルに存在しません".to_string());
        translations.insert("error.mapping_field_not_found".to_string(), mapping_not_found);

        // 重命名冲突
        let mut rename_collision = HashMap::new();
        rename_collision.insert("zh-CN".to_string(), "传输字段名 '{field}' 重复，字段映射必须是单射".to_string());
        rename_collision.insert("en-US".to_string(), "Transfer field name '{field}' is produced twice, field_mapping must be injective".to_string());
        rename_collision.insert("ja-JP".to_string(), "転送フィールド名 '{field}' が重複しています。field_mapping は単射である必要があります".to_string());
        translations.insert("error.rename_collision".to_string(), rename_collision);

        // 附加字段冲突
        let mut extra_collision = HashMap::new();
        extra_collision.insert("zh-CN".to_string(), "附加字段 '{field}' 与已有字段冲突".to_string());
        extra_collision.insert("en-US".to_string(), "Additional field '{field}' collides with an existing field".to_string());
        extra_collision.insert("ja-JP".to_string(), "追加フィールド '{field}' が既存のフィールドと衝突しています".to_string());
        translations.insert("error.extra_field_collision".to_string(), extra_collision);

        // 注解不合法
        let mut invalid_annotation = HashMap::new();
        invalid_annotation.insert("zh-CN".to_string(), "注解必须且只能携带一个 DtoConfig，实际携带 {count} 项: {detail}".to_string());
        invalid_annotation.insert("en-US".to_string(), "Annotation must carry exactly one DtoConfig, got {count} item(s): {detail}".to_string());
        invalid_annotation.insert("ja-JP".to_string(), "アノテーションは DtoConfig を1つだけ持つ必要があります。{count} 件: {detail}".to_string());
        translations.insert("error.invalid_annotation".to_string(), invalid_annotation);

        // 模型构造后的类型不符
        let mut downcast_failed = HashMap::new();
        downcast_failed.insert("zh-CN".to_string(), "适配器 '{adapter}' 构造的实例不是模型 '{model}'".to_string());
        downcast_failed.insert("en-US".to_string(), "Adapter '{adapter}' constructed an instance that is not a '{model}'".to_string());
        downcast_failed.insert("ja-JP".to_string(), "アダプター '{adapter}' が構築したインスタンスは '{model}' ではありません".to_string());
        translations.insert("error.downcast_failed".to_string(), downcast_failed);

        // 字段不能为空
        let mut not_nullable = HashMap::new();
        not_nullable.insert("zh-CN".to_string(), "字段不能为空".to_string());
        not_nullable.insert("en-US".to_string(), "field may not be null".to_string());
        not_nullable.insert("ja-JP".to_string(), "フィールドは null にできません".to_string());
        translations.insert("error.not_nullable".to_string(), not_nullable);

        // 期望数组载荷
        let mut expected_array = HashMap::new();
        expected_array.insert("zh-CN".to_string(), "期望数组，但收到: {actual}".to_string());
        expected_array.insert("en-US".to_string(), "expected an array, got {actual}".to_string());
        expected_array.insert("ja-JP".to_string(), "配列が必要ですが、{actual} でした".to_string());
        translations.insert("error.expected_array".to_string(), expected_array);

        // 正则表达式无效
        let mut invalid_pattern = HashMap::new();
        invalid_pattern.insert("zh-CN".to_string(), "正则表达式无效: {detail}".to_string());
        invalid_pattern.insert("en-US".to_string(), "invalid regular expression: {detail}".to_string());
        invalid_pattern.insert("ja-JP".to_string(), "正規表現が無効です: {detail}".to_string());
        translations.insert("error.invalid_pattern".to_string(), invalid_pattern);

        // 字符串不匹配正则
        let mut pattern_mismatch = HashMap::new();
        pattern_mismatch.insert("zh-CN".to_string(), "字符串不匹配正则表达式 {pattern}".to_string());
        pattern_mismatch.insert("en-US".to_string(), "string does not match pattern {pattern}".to_string());
        pattern_mismatch.insert("ja-JP".to_string(), "文字列がパターン {pattern} に一致しません".to_string());
        translations.insert("error.pattern_mismatch".to_string(), pattern_mismatch);

        // 传输类型字段重复
        let mut duplicate_field = HashMap::new();
        duplicate_field.insert("zh-CN".to_string(), "传输类型 {transfer} 的字段 '{field}' 重复".to_string());
        duplicate_field.insert("en-US".to_string(), "Transfer type {transfer} declares field '{field}' twice".to_string());
        duplicate_field.insert("ja-JP".to_string(), "転送型 {transfer} のフィールド '{field}' が重複しています".to_string());
        translations.insert("error.duplicate_transfer_field".to_string(), duplicate_field);

        // 传输类型含未解析的前向引用
        let mut transfer_ref = HashMap::new();
        transfer_ref.insert("zh-CN".to_string(), "传输类型 {transfer} 的字段 '{field}' 含有未解析的前向引用 {target}".to_string());
        transfer_ref.insert("en-US".to_string(), "Field '{field}' of transfer type {transfer} has unresolved forward reference {target}".to_string());
        transfer_ref.insert("ja-JP".to_string(), "転送型 {transfer} のフィールド '{field}' に未解決の前方参照 {target} があります".to_string());
        translations.insert("error.unresolved_transfer_ref".to_string(), transfer_ref);

        // 传输类型默认值不合法
        let mut invalid_default = HashMap::new();
        invalid_default.insert("zh-CN".to_string(), "传输类型 {transfer} 的字段 '{field}' 默认值不合法: {detail}".to_string());
        invalid_default.insert("en-US".to_string(), "Default of field '{field}' in transfer type {transfer} is invalid: {detail}".to_string());
        invalid_default.insert("ja-JP".to_string(), "転送型 {transfer} のフィールド '{field}' のデフォルト値が不正です: {detail}".to_string());
        translations.insert("error.invalid_transfer_default".to_string(), invalid_default);

        // 模型族不符
        let mut not_field_model = HashMap::new();
        not_field_model.insert("zh-CN".to_string(), "模型 {model} 不是字段型模型".to_string());
        not_field_model.insert("en-US".to_string(), "Model {model} does not declare fields".to_string());
        not_field_model.insert("ja-JP".to_string(), "モデル {model} はフィールド型モデルではありません".to_string());
        translations.insert("error.not_field_model".to_string(), not_field_model);

        let mut not_table_model = HashMap::new();
        not_table_model.insert("zh-CN".to_string(), "模型 {model} 不是表映射模型".to_string());
        not_table_model.insert("en-US".to_string(), "Model {model} is not mapped to a table".to_string());
        not_table_model.insert("ja-JP".to_string(), "モデル {model} はテーブルにマッピングされていません".to_string());
        translations.insert("error.not_table_model".to_string(), not_table_model);

        // 配置错误
        let mut config_errors = HashMap::new();
        config_errors.insert("zh-CN".to_string(), "配置错误: {message}".to_string());
        config_errors.insert("en-US".to_string(), "Configuration error: {message}".to_string());
        config_errors.insert("ja-JP".to_string(), "設定エラー: {message}".to_string());
        translations.insert("error.config".to_string(), config_errors);

        // 验证错误
        let mut validation_errors = HashMap::new();
        validation_errors.insert("zh-CN".to_string(), "数据验证失败: {field} - {message}".to_string());
        validation_errors.insert("en-US".to_string(), "Data validation failed: {field} - {message}".to_string());
        validation_errors.insert("ja-JP".to_string(), "データ検証が失敗しました: {field} - {message}".to_string());
        translations.insert("error.validation".to_string(), validation_errors);

        // 必填字段缺失（外部数据）
        let mut field_required = HashMap::new();
        field_required.insert("zh-CN".to_string(), "必填字段缺失".to_string());
        field_required.insert("en-US".to_string(), "field required".to_string());
        field_required.insert("ja-JP".to_string(), "必須フィールドがありません".to_string());
        translations.insert("error.field_required".to_string(), field_required);

        // 未知字段
        let mut unknown_field = HashMap::new();
        unknown_field.insert("zh-CN".to_string(), "不允许的额外字段".to_string());
        unknown_field.insert("en-US".to_string(), "extra fields not permitted".to_string());
        unknown_field.insert("ja-JP".to_string(), "追加フィールドは許可されていません".to_string());
        translations.insert("error.unknown_field".to_string(), unknown_field);

        // 类型不匹配
        let mut type_mismatch = HashMap::new();
        type_mismatch.insert("zh-CN".to_string(), "期望 {expected}，实际为 {actual}".to_string());
        type_mismatch.insert("en-US".to_string(), "expected {expected}, got {actual}".to_string());
        type_mismatch.insert("ja-JP".to_string(), "{expected} が必要ですが、{actual} でした".to_string());
        translations.insert("error.type_mismatch".to_string(), type_mismatch);

        // 序列化错误
        let mut serialization_errors = HashMap::new();
        serialization_errors.insert("zh-CN".to_string(), "数据序列化失败: {message}".to_string());
        serialization_errors.insert("en-US".to_string(), "Data serialization failed: {message}".to_string());
        serialization_errors.insert("ja-JP".to_string(), "データシリアライズが失敗しました: {message}".to_string());
        translations.insert("error.serialization".to_string(), serialization_errors);

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        ensure_registered();

        // 从环境变量获取语言设置，默认为zh-CN
        let lang = std::env::var("RAT_LANG")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_else(|_| "zh-CN".to_string());

        // 标准化语言代码
        use rat_embed_lang::normalize_language_code;
        let normalized_lang = normalize_language_code(&lang);
        set_language(&normalized_lang);
    }
}

/// 重新导出rat_embed_lang的核心函数
pub use rat_embed_lang::{current_language, set_language, t, tf};
